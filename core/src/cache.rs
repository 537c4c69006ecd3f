//! Cache seam implemented by the Redis crate.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::CatalogError;
use crate::review::Review;

/// TTL'd read cache for a product's rating and paginated review lists.
///
/// Missing keys are `Ok(None)` / no-ops, never errors. Writers treat every
/// method as best-effort: a failure is worth a warn log, not a failed
/// request, because incoherence only costs an extra cache miss bounded by
/// the TTL.
#[async_trait]
pub trait ProductCache: Send + Sync {
    /// Cached average rating, if present.
    async fn rating(&self, product_id: Uuid) -> Result<Option<Decimal>, CatalogError>;

    /// Store the average rating under the rating TTL.
    async fn set_rating(&self, product_id: Uuid, rating: Decimal) -> Result<(), CatalogError>;

    /// Drop the cached rating.
    async fn invalidate_rating(&self, product_id: Uuid) -> Result<(), CatalogError>;

    /// Cached review page for `(product, limit, offset)`, if present.
    async fn reviews_page(
        &self,
        product_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Option<Vec<Review>>, CatalogError>;

    /// Store a review page under the list TTL and record its key in the
    /// product's tracking set, extending the set's TTL alongside.
    async fn set_reviews_page(
        &self,
        product_id: Uuid,
        limit: i64,
        offset: i64,
        reviews: &[Review],
    ) -> Result<(), CatalogError>;

    /// Drop every tracked review page plus the tracking set itself.
    async fn invalidate_reviews(&self, product_id: Uuid) -> Result<(), CatalogError>;

    /// Drop the rating and every tracked review page for a product.
    async fn invalidate_all(&self, product_id: Uuid) -> Result<(), CatalogError> {
        self.invalidate_rating(product_id).await?;
        self.invalidate_reviews(product_id).await
    }
}
