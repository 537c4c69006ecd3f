//! Application state shared across handlers.

use std::sync::Arc;

use catalog_service::{ProductService, ReviewService};

/// Services shared with every handler. Cheap to clone; axum clones it per
/// request.
#[derive(Clone)]
pub struct AppState {
    /// Product CRUD and rating read-through.
    pub products: Arc<ProductService>,
    /// Review mutations and the cached review list read path.
    pub reviews: Arc<ReviewService>,
}

impl AppState {
    /// Bundle the services.
    #[must_use]
    pub fn new(products: Arc<ProductService>, reviews: Arc<ReviewService>) -> Self {
        Self { products, reviews }
    }
}
