//! Review repository backed by PostgreSQL.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use catalog_core::{CatalogError, NewReview, Review, ReviewRepository, ReviewUpdate};

use crate::{review_from_row, storage_err};

/// [`ReviewRepository`] implementation on a shared [`PgPool`].
#[derive(Debug, Clone)]
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn create(&self, review: &NewReview) -> Result<Review, CatalogError> {
        // Checked up front so the caller sees NotFound instead of a raw
        // foreign-key violation.
        let product_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(review.product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        if !product_exists {
            return Err(CatalogError::NotFound);
        }

        let row = sqlx::query(
            r"
            INSERT INTO reviews (product_id, first_name, last_name, review_text, rating)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, product_id, first_name, last_name, review_text, rating,
                      created_at, updated_at, deleted_at
            ",
        )
        .bind(review.product_id)
        .bind(&review.first_name)
        .bind(&review.last_name)
        .bind(&review.review_text)
        .bind(review.rating)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(review_from_row(&row))
    }

    async fn get(&self, id: Uuid) -> Result<Review, CatalogError> {
        let row = sqlx::query(
            r"
            SELECT id, product_id, first_name, last_name, review_text, rating,
                   created_at, updated_at, deleted_at
            FROM reviews
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(|r| review_from_row(&r)).ok_or(CatalogError::NotFound)
    }

    async fn list_for_product(
        &self,
        product_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Review>, CatalogError> {
        let rows = sqlx::query(
            r"
            SELECT id, product_id, first_name, last_name, review_text, rating,
                   created_at, updated_at, deleted_at
            FROM reviews
            WHERE product_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(product_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows.iter().map(review_from_row).collect())
    }

    async fn count_for_product(&self, product_id: Uuid) -> Result<i64, CatalogError> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM reviews WHERE product_id = $1 AND deleted_at IS NULL",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)
    }

    async fn update(&self, id: Uuid, update: &ReviewUpdate) -> Result<Review, CatalogError> {
        let row = sqlx::query(
            r"
            UPDATE reviews
            SET first_name = $1, last_name = $2, review_text = $3, rating = $4,
                updated_at = now()
            WHERE id = $5 AND deleted_at IS NULL
            RETURNING id, product_id, first_name, last_name, review_text, rating,
                      created_at, updated_at, deleted_at
            ",
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.review_text)
        .bind(update.rating)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(|r| review_from_row(&r)).ok_or(CatalogError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), CatalogError> {
        let result = sqlx::query(
            "UPDATE reviews SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }

        Ok(())
    }
}
