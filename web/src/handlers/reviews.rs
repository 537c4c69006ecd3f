//! Review endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use catalog_core::{NewReview, ReviewUpdate};

use crate::error::AppError;
use crate::handlers::{parse_id, PageQuery};
use crate::response;
use crate::state::AppState;

/// `POST /api/v1/reviews` request body. The product id arrives as a string
/// so a malformed UUID maps to a 400 instead of a serde type error.
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    /// Owning product id as a canonical UUID string.
    pub product_id: String,
    /// Reviewer first name.
    pub first_name: String,
    /// Reviewer last name.
    pub last_name: String,
    /// Free-text body.
    pub review_text: String,
    /// Star rating in 1..=5.
    pub rating: i16,
}

/// `POST /api/v1/reviews`
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = body.map_err(|_| AppError::bad_request("Invalid request body"))?;
    let product_id = parse_id(&req.product_id, "product")?;

    let review = state
        .reviews
        .create(NewReview {
            product_id,
            first_name: req.first_name,
            last_name: req.last_name,
            review_text: req.review_text,
            rating: req.rating,
        })
        .await?;

    Ok(response::created(review))
}

/// `PUT /api/v1/reviews/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ReviewUpdate>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "review")?;
    let Json(input) = body.map_err(|_| AppError::bad_request("Invalid request body"))?;
    let review = state.reviews.update(id, input).await?;
    Ok(response::success(review))
}

/// `DELETE /api/v1/reviews/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "review")?;
    state.reviews.delete(id).await?;
    Ok(response::no_content())
}

/// `GET /api/v1/products/{id}/reviews`
pub async fn list_for_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Option<Query<PageQuery>>,
) -> Result<Response, AppError> {
    let product_id = parse_id(&id, "product")?;
    let Query(page) = query.unwrap_or_default();
    let (limit, offset) = page.limit_offset();
    let (limit, offset) = catalog_service::clamp_page(limit, offset);

    let (reviews, total) = state
        .reviews
        .list_for_product(product_id, limit, offset)
        .await?;

    Ok(response::paginated(reviews, total, limit, offset))
}
