//! Product endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;

use catalog_core::{NewProduct, ProductUpdate};

use crate::error::AppError;
use crate::handlers::{parse_id, PageQuery};
use crate::response;
use crate::state::AppState;

/// `POST /api/v1/products`
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(input) = body.map_err(|_| AppError::bad_request("Invalid request body"))?;
    let product = state.products.create(input).await?;
    Ok(response::created(product))
}

/// `GET /api/v1/products`
pub async fn list(
    State(state): State<AppState>,
    query: Option<Query<PageQuery>>,
) -> Result<Response, AppError> {
    let Query(page) = query.unwrap_or_default();
    let (limit, offset) = page.limit_offset();
    let (limit, offset) = catalog_service::clamp_page(limit, offset);
    let (products, total) = state.products.list(limit, offset).await?;
    Ok(response::paginated(products, total, limit, offset))
}

/// `GET /api/v1/products/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "product")?;
    let product = state.products.get(id).await?;
    Ok(response::success(product))
}

/// `PUT /api/v1/products/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ProductUpdate>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "product")?;
    let Json(input) = body.map_err(|_| AppError::bad_request("Invalid request body"))?;
    let product = state.products.update(id, input).await?;
    Ok(response::success(product))
}

/// `DELETE /api/v1/products/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "product")?;
    state.products.delete(id).await?;
    Ok(response::no_content())
}
