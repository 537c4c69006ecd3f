//! HTTP handlers.

use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;

pub mod products;
pub mod reviews;

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Query-string pagination; invalid or absent values fall back to the
/// service-side defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Requested page size.
    pub limit: Option<i64>,
    /// Requested page start.
    pub offset: Option<i64>,
}

impl PageQuery {
    /// Raw limit/offset for the service to clamp; zero limit means "use the
    /// default".
    #[must_use]
    pub fn limit_offset(&self) -> (i64, i64) {
        (self.limit.unwrap_or(0), self.offset.unwrap_or(0))
    }
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request(format!("Invalid {what} ID")))
}
