//! Router configuration.

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;

use crate::handlers::{self, products, reviews};
use crate::middleware::{log_requests, recover_panics};
use crate::state::AppState;

/// Build the complete router: health probe plus the versioned API, wrapped
/// in panic recovery, request logging, CORS and a request timeout.
///
/// `allowed_origins` is the CORS allow-list; requests from other origins get
/// no CORS headers.
pub fn build_router(
    state: AppState,
    request_timeout: Duration,
    allowed_origins: &[String],
) -> Router {
    let api = Router::new()
        .route("/products", post(products::create).get(products::list))
        .route(
            "/products/:id",
            get(products::get)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/products/:id/reviews", get(reviews::list_for_product))
        .route("/reviews", post(reviews::create))
        .route("/reviews/:id", put(reviews::update).delete(reviews::delete));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .layer(middleware::from_fn(log_requests))
        .layer(middleware::from_fn(recover_panics))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// Restrictive CORS: only the configured origins, the API's methods and the
/// headers browsers actually send. Credentials stay disallowed.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::LINK])
        .max_age(Duration::from_secs(300))
}
