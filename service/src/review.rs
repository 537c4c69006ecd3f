//! Review write service and the cached review read path.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use catalog_core::{
    CatalogError, EventKind, EventPublisher, NewReview, ProductCache, Review, ReviewEvent,
    ReviewRepository, ReviewUpdate, REVIEW_EVENTS_SUBJECT,
};

use crate::clamp_page;

/// Budget for the detached publish task.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Review mutations and the cached review list read path.
///
/// Every mutation follows the same five phases: validate, persist, invalidate
/// the owning product's cache (best-effort), publish a `ReviewEvent`
/// (detached, best-effort), return the snapshot. Persist must precede
/// invalidate (otherwise the invalidation races an outdated refill), and
/// invalidate precedes publish so the worker's recompute lands in a cache
/// that refills from the new state.
///
/// The service holds no locks; correctness under concurrent writers is
/// delegated to the store's row-level semantics and the worker's idempotent
/// recompute.
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    cache: Arc<dyn ProductCache>,
    publisher: Arc<dyn EventPublisher>,
}

impl ReviewService {
    /// Wire the service to its collaborators.
    #[must_use]
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        cache: Arc<dyn ProductCache>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            reviews,
            cache,
            publisher,
        }
    }

    /// Create a review for a live product.
    ///
    /// # Errors
    ///
    /// `InvalidInput` on validation failure, `NotFound` when the product is
    /// missing or deleted, `Storage` on database failure. Cache and bus
    /// failures do not fail the write.
    pub async fn create(&self, input: NewReview) -> Result<Review, CatalogError> {
        input.validate()?;

        let review = self.reviews.create(&input).await?;

        self.invalidate_product(review.product_id).await;
        self.publish_event(ReviewEvent::new(
            EventKind::Created,
            review.product_id,
            Some(review.clone()),
        ));

        tracing::info!(
            review_id = %review.id,
            product_id = %review.product_id,
            rating = review.rating,
            "Review created"
        );

        Ok(review)
    }

    /// Fetch a live review by id.
    ///
    /// # Errors
    ///
    /// `NotFound` when no live row matches, `Storage` on database failure.
    pub async fn get(&self, id: Uuid) -> Result<Review, CatalogError> {
        self.reviews.get(id).await
    }

    /// Page of a product's live reviews with the total count.
    ///
    /// Consults the page cache first, falls back to the store, refills the
    /// cache best-effort. Pagination is clamped to 1..=100 with a default
    /// of 20.
    ///
    /// # Errors
    ///
    /// `Storage` on database failure; cache failures fall through to the
    /// store.
    pub async fn list_for_product(
        &self,
        product_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Review>, i64), CatalogError> {
        let (limit, offset) = clamp_page(limit, offset);

        match self.cache.reviews_page(product_id, limit, offset).await {
            Ok(Some(reviews)) => {
                tracing::debug!(%product_id, limit, offset, "Review list cache hit");
                let total = self.reviews.count_for_product(product_id).await?;
                return Ok((reviews, total));
            }
            Ok(None) => {
                tracing::debug!(%product_id, limit, offset, "Review list cache miss");
            }
            Err(err) => {
                tracing::warn!(%product_id, error = %err, "Review list cache read failed");
            }
        }

        let reviews = self
            .reviews
            .list_for_product(product_id, limit, offset)
            .await?;
        let total = self.reviews.count_for_product(product_id).await?;

        if let Err(err) = self
            .cache
            .set_reviews_page(product_id, limit, offset, &reviews)
            .await
        {
            tracing::warn!(%product_id, limit, offset, error = %err, "Failed to cache review list");
        }

        Ok((reviews, total))
    }

    /// Update a live review.
    ///
    /// The product id is not part of the request body; the stored row is
    /// fetched first and its product id carried forward into the cache
    /// invalidation and the published event.
    ///
    /// # Errors
    ///
    /// `InvalidInput`, `NotFound`, or `Storage` as for [`Self::create`].
    pub async fn update(&self, id: Uuid, input: ReviewUpdate) -> Result<Review, CatalogError> {
        input.validate()?;

        let existing = self.reviews.get(id).await?;
        let updated = self.reviews.update(id, &input).await?;

        self.invalidate_product(existing.product_id).await;
        self.publish_event(ReviewEvent::new(
            EventKind::Updated,
            existing.product_id,
            Some(updated.clone()),
        ));

        tracing::info!(
            review_id = %id,
            product_id = %existing.product_id,
            rating = updated.rating,
            "Review updated"
        );

        Ok(updated)
    }

    /// Soft-delete a live review.
    ///
    /// # Errors
    ///
    /// `NotFound` when no live row matches, `Storage` on database failure.
    pub async fn delete(&self, id: Uuid) -> Result<(), CatalogError> {
        let existing = self.reviews.get(id).await?;
        self.reviews.delete(id).await?;

        self.invalidate_product(existing.product_id).await;
        self.publish_event(ReviewEvent::new(
            EventKind::Deleted,
            existing.product_id,
            Some(existing.clone()),
        ));

        tracing::info!(
            review_id = %id,
            product_id = %existing.product_id,
            "Review deleted"
        );

        Ok(())
    }

    /// Best-effort cache invalidation. Serving briefly stale reads beats
    /// failing the write because the cache is degraded.
    async fn invalidate_product(&self, product_id: Uuid) {
        if let Err(err) = self.cache.invalidate_all(product_id).await {
            tracing::warn!(
                %product_id,
                error = %err,
                "Failed to invalidate product cache"
            );
        }
    }

    /// Publish the event on a task detached from the caller, under its own
    /// timeout, so a client disconnect after the commit cannot cancel the
    /// durability handshake. Failures are logged; the rating is corrected by
    /// the next event for the product.
    fn publish_event(&self, event: ReviewEvent) {
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(
                    product_id = %event.product_id,
                    error = %err,
                    "Failed to encode review event"
                );
                return;
            }
        };

        let publisher = Arc::clone(&self.publisher);
        let product_id = event.product_id;
        tokio::spawn(async move {
            match tokio::time::timeout(
                PUBLISH_TIMEOUT,
                publisher.publish(REVIEW_EVENTS_SUBJECT, payload),
            )
            .await
            {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(%product_id, error = %err, "Failed to publish review event");
                }
                Err(_) => {
                    tracing::error!(%product_id, "Timed out publishing review event");
                }
            }
        });
    }
}
