//! Storage seams implemented by the Postgres crate.
//!
//! All reads exclude soft-deleted rows. Pagination is limit/offset ordered by
//! `created_at DESC`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CatalogError;
use crate::product::{NewProduct, Product, ProductUpdate};
use crate::review::{NewReview, Review, ReviewUpdate};

/// Durable storage for products.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a product and return the stored row.
    async fn create(&self, product: &NewProduct) -> Result<Product, CatalogError>;

    /// Fetch a live product by id, `NotFound` otherwise.
    async fn get(&self, id: Uuid) -> Result<Product, CatalogError>;

    /// Page of live products ordered by creation time, newest first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Product>, CatalogError>;

    /// Number of live products.
    async fn count(&self) -> Result<i64, CatalogError>;

    /// Update a live product under optimistic concurrency. The stored version
    /// must equal `update.version`; a mismatch (or a concurrent bump by the
    /// rating worker) yields `Conflict`.
    async fn update(&self, id: Uuid, update: &ProductUpdate) -> Result<Product, CatalogError>;

    /// Soft-delete a product and all its live reviews in one transaction.
    async fn delete_with_reviews(&self, id: Uuid) -> Result<(), CatalogError>;
}

/// Durable storage for reviews.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Insert a review after confirming a live product with that id exists;
    /// a missing or deleted product yields `NotFound` rather than a raw
    /// foreign-key error.
    async fn create(&self, review: &NewReview) -> Result<Review, CatalogError>;

    /// Fetch a live review by id, `NotFound` otherwise.
    async fn get(&self, id: Uuid) -> Result<Review, CatalogError>;

    /// Page of a product's live reviews, newest first.
    async fn list_for_product(
        &self,
        product_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Review>, CatalogError>;

    /// Number of live reviews for a product.
    async fn count_for_product(&self, product_id: Uuid) -> Result<i64, CatalogError>;

    /// Update a live review, returning the stored row.
    async fn update(&self, id: Uuid, update: &ReviewUpdate) -> Result<Review, CatalogError>;

    /// Soft-delete a live review, `NotFound` when no live row matched.
    async fn delete(&self, id: Uuid) -> Result<(), CatalogError>;
}
