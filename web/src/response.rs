//! JSON response envelope helpers.
//!
//! Success bodies are `{"success":true,"data":…}`; list endpoints add a
//! `pagination` object. Errors are produced by [`crate::AppError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// 200 with the success envelope.
pub fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(json!({ "success": true, "data": data }))).into_response()
}

/// 201 with the success envelope.
pub fn created<T: Serialize>(data: T) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": data })),
    )
        .into_response()
}

/// 204 without a body.
#[must_use]
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// 200 with the success envelope plus pagination metadata.
pub fn paginated<T: Serialize>(data: T, total: i64, limit: i64, offset: i64) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": data,
            "pagination": { "total": total, "limit": limit, "offset": offset },
        })),
    )
        .into_response()
}
