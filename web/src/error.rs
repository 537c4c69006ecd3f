//! Bridge between domain errors and HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use catalog_core::CatalogError;

/// HTTP-facing error: a status code and the message for the `{"error":…}`
/// body. Infrastructure details are logged, never sent to the client.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    /// Build an error with an explicit status.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// The response status, for tests.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidInput(message) => Self::new(StatusCode::BAD_REQUEST, message),
            CatalogError::NotFound => Self::new(StatusCode::NOT_FOUND, "resource not found"),
            CatalogError::Conflict => Self::new(
                StatusCode::CONFLICT,
                "version conflict, re-read the resource and retry",
            ),
            CatalogError::Storage(detail)
            | CatalogError::Cache(detail)
            | CatalogError::Bus(detail) => {
                tracing::error!(error = %detail, "Internal error in handler");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
