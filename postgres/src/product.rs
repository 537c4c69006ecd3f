//! Product repository backed by PostgreSQL.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use catalog_core::{
    CatalogError, NewProduct, Product, ProductRepository, ProductUpdate,
};

use crate::{product_from_row, storage_err};

/// [`ProductRepository`] implementation on a shared [`PgPool`].
#[derive(Debug, Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, product: &NewProduct) -> Result<Product, CatalogError> {
        let row = sqlx::query(
            r"
            INSERT INTO products (name, description, price)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, price, average_rating, version,
                      created_at, updated_at, deleted_at
            ",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(product_from_row(&row))
    }

    async fn get(&self, id: Uuid) -> Result<Product, CatalogError> {
        let row = sqlx::query(
            r"
            SELECT id, name, description, price, average_rating, version,
                   created_at, updated_at, deleted_at
            FROM products
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(|r| product_from_row(&r)).ok_or(CatalogError::NotFound)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Product>, CatalogError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, description, price, average_rating, version,
                   created_at, updated_at, deleted_at
            FROM products
            WHERE deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows.iter().map(product_from_row).collect())
    }

    async fn count(&self) -> Result<i64, CatalogError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)
    }

    async fn update(&self, id: Uuid, update: &ProductUpdate) -> Result<Product, CatalogError> {
        let row = sqlx::query(
            r"
            UPDATE products
            SET name = $1, description = $2, price = $3,
                updated_at = now(), version = version + 1
            WHERE id = $4 AND deleted_at IS NULL AND version = $5
            RETURNING id, name, description, price, average_rating, version,
                      created_at, updated_at, deleted_at
            ",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.price)
        .bind(id)
        .bind(update.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        // Zero rows means the version moved under us (possibly bumped by the
        // rating worker) or the row is gone; both surface as a conflict the
        // caller resolves by re-reading.
        match row {
            Some(row) => Ok(product_from_row(&row)),
            None => {
                tracing::warn!(
                    product_id = %id,
                    expected_version = update.version,
                    "Optimistic concurrency conflict on product update"
                );
                Err(CatalogError::Conflict)
            }
        }
    }

    async fn delete_with_reviews(&self, id: Uuid) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let result = sqlx::query(
            "UPDATE products SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }

        let reviews = sqlx::query(
            "UPDATE reviews SET deleted_at = now() WHERE product_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;

        tracing::info!(
            product_id = %id,
            cascaded_reviews = reviews.rows_affected(),
            "Soft-deleted product with its reviews"
        );

        Ok(())
    }
}
