//! HTTP surface for the product review catalog.
//!
//! Axum handlers over the services from `catalog-service`, with the JSON
//! response envelope (`{"success":true,"data":…}` / `{"error":…}`), the
//! `CatalogError` → status mapping, pagination extraction, request logging
//! and panic recovery.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod state;

pub use error::AppError;
pub use router::build_router;
pub use state::AppState;
