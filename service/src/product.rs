//! Product service: CRUD with optimistic concurrency and the cached-rating
//! read-through.

use std::sync::Arc;

use uuid::Uuid;

use catalog_core::{
    CatalogError, NewProduct, Product, ProductCache, ProductRepository, ProductUpdate,
};

use crate::clamp_page;

/// Product business logic.
///
/// Updates go through the repository's version check and surface `Conflict`
/// on a mismatch, including the case where the rating worker bumped the
/// version between the caller's read and write. Deletes cascade to the
/// product's reviews and drop its cache entries.
pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    cache: Arc<dyn ProductCache>,
}

impl ProductService {
    /// Wire the service to its collaborators.
    #[must_use]
    pub fn new(products: Arc<dyn ProductRepository>, cache: Arc<dyn ProductCache>) -> Self {
        Self { products, cache }
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// `InvalidInput` on validation failure, `Storage` on database failure.
    pub async fn create(&self, input: NewProduct) -> Result<Product, CatalogError> {
        input.validate()?;

        let product = self.products.create(&input).await?;

        tracing::info!(
            product_id = %product.id,
            name = %product.name,
            "Product created"
        );

        Ok(product)
    }

    /// Fetch a live product, overlaying the cached rating when one exists
    /// and refilling the cache from the row otherwise. Cache trouble never
    /// fails the read.
    ///
    /// # Errors
    ///
    /// `NotFound` when no live row matches, `Storage` on database failure.
    pub async fn get(&self, id: Uuid) -> Result<Product, CatalogError> {
        let mut product = self.products.get(id).await?;

        match self.cache.rating(id).await {
            Ok(Some(rating)) => product.average_rating = rating,
            Ok(None) => {
                if let Err(err) = self.cache.set_rating(id, product.average_rating).await {
                    tracing::warn!(product_id = %id, error = %err, "Failed to cache rating");
                }
            }
            Err(err) => {
                tracing::warn!(product_id = %id, error = %err, "Rating cache read failed");
            }
        }

        Ok(product)
    }

    /// Page of live products with the total count.
    ///
    /// # Errors
    ///
    /// `Storage` on database failure.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<(Vec<Product>, i64), CatalogError> {
        let (limit, offset) = clamp_page(limit, offset);
        let products = self.products.list(limit, offset).await?;
        let total = self.products.count().await?;
        Ok((products, total))
    }

    /// Update a live product under optimistic concurrency.
    ///
    /// # Errors
    ///
    /// `InvalidInput` on validation failure, `Conflict` when the presented
    /// version is stale, `Storage` on database failure.
    pub async fn update(&self, id: Uuid, input: ProductUpdate) -> Result<Product, CatalogError> {
        input.validate()?;

        let product = self.products.update(id, &input).await?;

        tracing::info!(
            product_id = %product.id,
            version = product.version,
            "Product updated"
        );

        Ok(product)
    }

    /// Soft-delete a product and all its live reviews, then drop the
    /// product's cache entries best-effort.
    ///
    /// # Errors
    ///
    /// `NotFound` when no live row matches, `Storage` on database failure.
    pub async fn delete(&self, id: Uuid) -> Result<(), CatalogError> {
        self.products.delete_with_reviews(id).await?;

        if let Err(err) = self.cache.invalidate_all(id).await {
            tracing::warn!(product_id = %id, error = %err, "Failed to invalidate product cache");
        }

        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{FakeCache, FakeProductRepository};
    use rust_decimal::Decimal;

    struct Harness {
        repo: Arc<FakeProductRepository>,
        cache: Arc<FakeCache>,
        service: ProductService,
    }

    fn harness() -> Harness {
        let repo = Arc::new(FakeProductRepository::default());
        let cache = Arc::new(FakeCache::default());
        let service = ProductService::new(repo.clone(), cache.clone());
        Harness {
            repo,
            cache,
            service,
        }
    }

    fn new_product(name: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            price: Decimal::new(1999, 2),
        }
    }

    #[tokio::test]
    async fn create_validates_and_stores() {
        let h = harness();

        let product = h.service.create(new_product("Laptop")).await.unwrap();
        assert_eq!(product.name, "Laptop");
        assert_eq!(product.version, 1);

        let invalid = h.service.create(new_product("")).await;
        assert!(matches!(invalid, Err(CatalogError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn get_overlays_cached_rating() {
        let h = harness();
        let product = h.service.create(new_product("Laptop")).await.unwrap();

        let cached: Decimal = "4.5".parse().unwrap();
        h.cache.seed_rating(product.id, cached);

        let fetched = h.service.get(product.id).await.unwrap();
        assert_eq!(fetched.average_rating, cached);
    }

    #[tokio::test]
    async fn get_refills_the_rating_cache_on_miss() {
        let h = harness();
        let product = h.service.create(new_product("Laptop")).await.unwrap();
        h.repo.set_rating(product.id, "3.0".parse().unwrap());

        let fetched = h.service.get(product.id).await.unwrap();
        assert_eq!(fetched.average_rating, "3.0".parse::<Decimal>().unwrap());
        assert_eq!(h.cache.rating_entry(product.id), Some("3.0".parse().unwrap()));
    }

    #[tokio::test]
    async fn get_serves_the_row_when_the_cache_is_down() {
        let h = harness();
        let product = h.service.create(new_product("Laptop")).await.unwrap();
        h.cache.set_unavailable(true);

        let fetched = h.service.get(product.id).await.unwrap();
        assert_eq!(fetched.id, product.id);
    }

    #[tokio::test]
    async fn update_propagates_version_conflicts() {
        let h = harness();
        let product = h.service.create(new_product("Laptop")).await.unwrap();

        let stale = h
            .service
            .update(
                product.id,
                ProductUpdate {
                    name: "Laptop Pro".to_string(),
                    description: None,
                    price: Decimal::new(2999, 2),
                    version: product.version + 7,
                },
            )
            .await;
        assert!(matches!(stale, Err(CatalogError::Conflict)));

        let fresh = h
            .service
            .update(
                product.id,
                ProductUpdate {
                    name: "Laptop Pro".to_string(),
                    description: None,
                    price: Decimal::new(2999, 2),
                    version: product.version,
                },
            )
            .await
            .unwrap();
        assert_eq!(fresh.version, product.version + 1);
    }

    #[tokio::test]
    async fn delete_cascades_and_invalidates_cache() {
        let h = harness();
        let product = h.service.create(new_product("Laptop")).await.unwrap();

        h.service.delete(product.id).await.unwrap();
        assert!(matches!(
            h.service.get(product.id).await,
            Err(CatalogError::NotFound)
        ));
        assert_eq!(h.cache.invalidated(), vec![product.id]);
    }

    #[tokio::test]
    async fn list_returns_page_and_total() {
        let h = harness();
        for i in 0..3 {
            h.service
                .create(new_product(&format!("Product {i}")))
                .await
                .unwrap();
        }

        let (products, total) = h.service.list(2, 0).await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(total, 3);

        // Out-of-range limit falls back to the default page size.
        let (products, _) = h.service.list(0, 0).await.unwrap();
        assert_eq!(products.len(), 3);
    }
}
