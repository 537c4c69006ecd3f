//! The error type shared by every crate in the workspace.

use thiserror::Error;

/// Errors surfaced by the catalog's services and infrastructure.
///
/// The first three variants are caller-visible and map directly to HTTP
/// statuses (400, 404, 409). The infrastructure variants carry a message from
/// the underlying driver; whether they fail the request depends on the call
/// site; storage errors fail it, cache and bus errors are logged and swallowed by
/// the write path.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Input validation failed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The target row does not exist or is soft-deleted.
    #[error("resource not found")]
    NotFound,

    /// Optimistic version check failed on a product update.
    #[error("version conflict")]
    Conflict,

    /// The database rejected or failed an operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// The cache rejected or failed an operation.
    #[error("cache error: {0}")]
    Cache(String),

    /// The event bus rejected or failed an operation.
    #[error("event bus error: {0}")]
    Bus(String),
}

impl CatalogError {
    /// True for the transient infrastructure variants, false for the
    /// caller-visible ones.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Cache(_) | Self::Bus(_)
        )
    }
}
