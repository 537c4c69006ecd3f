//! PostgreSQL storage for the product review catalog.
//!
//! Implements the repository traits from `catalog-core` with sqlx. Queries
//! filter out soft-deleted rows, paginate with limit/offset ordered by
//! `created_at DESC`, and rely on the row's `version` column for optimistic
//! concurrency on product updates.
//!
//! Migrations are embedded from the workspace-level `migrations/` directory
//! and applied with [`run_migrations`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use catalog_core::{CatalogError, Product, Review};

mod product;
mod review;

pub use product::PgProductRepository;
pub use review::PgReviewRepository;

/// Connection pool tuning, loaded from configuration by the binaries.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Maximum open connections.
    pub max_connections: u32,
    /// Idle connections kept around.
    pub min_connections: u32,
    /// Recycle connections older than this.
    pub max_lifetime: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 25,
            min_connections: 5,
            max_lifetime: Duration::from_secs(300),
        }
    }
}

/// Connect to PostgreSQL and verify the connection with a ping.
///
/// # Errors
///
/// Returns [`CatalogError::Storage`] when the URL is invalid or the server
/// is unreachable.
pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<PgPool, CatalogError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .max_lifetime(settings.max_lifetime)
        .connect(database_url)
        .await
        .map_err(storage_err)?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(storage_err)?;

    Ok(pool)
}

/// Connect to PostgreSQL, retrying while the server comes up.
///
/// Used at process startup so a freshly started database container does not
/// fail the service; after `max_attempts` the last error is returned and the
/// binary exits non-zero.
///
/// # Errors
///
/// Returns the last connection error once every attempt is exhausted.
pub async fn connect_with_retry(
    database_url: &str,
    settings: &PoolSettings,
    max_attempts: u32,
    delay: Duration,
) -> Result<PgPool, CatalogError> {
    let mut last_err = CatalogError::Storage("no connection attempt made".to_string());

    for attempt in 1..=max_attempts {
        match connect(database_url, settings).await {
            Ok(pool) => return Ok(pool),
            Err(err) => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    error = %err,
                    "Database not ready, retrying"
                );
                last_err = err;
                if attempt < max_attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(last_err)
}

/// Apply all pending migrations from the workspace `migrations/` directory.
///
/// Idempotent: already-applied migrations are skipped.
///
/// # Errors
///
/// Returns [`CatalogError::Storage`] when a migration fails to execute.
pub async fn run_migrations(pool: &PgPool) -> Result<(), CatalogError> {
    sqlx::migrate!("../migrations")
        .run(pool)
        .await
        .map_err(|e| CatalogError::Storage(format!("migration failed: {e}")))?;

    tracing::info!("Database migrations completed");
    Ok(())
}

pub(crate) fn storage_err(err: sqlx::Error) -> CatalogError {
    CatalogError::Storage(err.to_string())
}

pub(crate) fn product_from_row(row: &PgRow) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price: row.get("price"),
        average_rating: row.get("average_rating"),
        version: row.get("version"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

pub(crate) fn review_from_row(row: &PgRow) -> Review {
    Review {
        id: row.get("id"),
        product_id: row.get("product_id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        review_text: row.get("review_text"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}
