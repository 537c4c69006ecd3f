//! Idempotent recomputation of a product's average rating.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use catalog_core::CatalogError;

/// The rating side effect the debouncer fires.
///
/// Implementations must be idempotent: repeated calls for the same product
/// converge on the same stored value, because the average is always derived
/// from the committed set of live reviews at statement time.
#[async_trait]
pub trait RatingCalculator: Send + Sync {
    /// Recompute and store the average rating for one product.
    async fn recompute(&self, product_id: Uuid) -> Result<(), CatalogError>;
}

/// [`RatingCalculator`] executing one atomic UPDATE against PostgreSQL.
///
/// The statement averages the live reviews, rounds to one fractional digit
/// (0 when the product has no live reviews), stamps `updated_at` and bumps
/// `version`. MVCC serializes the row update, so concurrent writers observe
/// a well-defined committed review set. The version bump means a concurrent
/// user edit can see a conflict even though the user changed nothing the
/// worker touched; the product row did change.
#[derive(Debug, Clone)]
pub struct PgRatingCalculator {
    pool: PgPool,
}

impl PgRatingCalculator {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Current stored rating of a live product, for verification in tests.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for a missing or deleted product,
    /// [`CatalogError::Storage`] on database failure.
    pub async fn current_rating(&self, product_id: Uuid) -> Result<Decimal, CatalogError> {
        let rating: Option<Decimal> = sqlx::query_scalar(
            "SELECT average_rating FROM products WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CatalogError::Storage(e.to_string()))?;

        rating.ok_or(CatalogError::NotFound)
    }
}

#[async_trait]
impl RatingCalculator for PgRatingCalculator {
    async fn recompute(&self, product_id: Uuid) -> Result<(), CatalogError> {
        let result = sqlx::query(
            r"
            UPDATE products
            SET
                average_rating = COALESCE(
                    (SELECT ROUND(AVG(rating)::numeric, 1)
                     FROM reviews
                     WHERE product_id = $1 AND deleted_at IS NULL),
                    0
                ),
                updated_at = now(),
                version = version + 1
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(product_id)
        .execute(&self.pool)
        .await
        .map_err(|e| CatalogError::Storage(format!("failed to update product rating: {e}")))?;

        if result.rows_affected() == 0 {
            tracing::info!(
                %product_id,
                "Product missing or deleted, skipping rating update"
            );
            return Ok(());
        }

        tracing::info!(%product_id, "Product rating recomputed");
        Ok(())
    }
}
