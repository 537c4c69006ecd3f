//! Catalog API server: products and reviews over HTTP, publishing review
//! events to the rating pipeline.

use std::sync::Arc;

use tracing::info;

use catalog_bus::JetStreamPublisher;
use catalog_cache::RedisCache;
use catalog_postgres::{PgProductRepository, PgReviewRepository};
use catalog_server::{init_tracing, shutdown_signal, Config, STARTUP_ATTEMPTS, STARTUP_DELAY};
use catalog_service::{ProductService, ReviewService};
use catalog_web::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = Config::from_env();

    info!("Starting catalog API");

    info!("Connecting to PostgreSQL");
    let pool = catalog_postgres::connect_with_retry(
        &config.database_url(),
        &config.pool_settings(),
        STARTUP_ATTEMPTS,
        STARTUP_DELAY,
    )
    .await?;
    catalog_postgres::run_migrations(&pool).await?;
    info!("Connected to PostgreSQL");

    info!("Connecting to Redis");
    let cache = Arc::new(
        RedisCache::connect_with_retry(
            &config.redis_url(),
            config.cache.rating_ttl,
            config.cache.list_ttl,
            STARTUP_ATTEMPTS,
            STARTUP_DELAY,
        )
        .await?,
    );
    info!("Connected to Redis");

    info!("Connecting to NATS");
    let client =
        catalog_bus::connect_with_retry(&config.nats.url, STARTUP_ATTEMPTS, STARTUP_DELAY).await?;
    let publisher = Arc::new(JetStreamPublisher::new(client));
    catalog_bus::ensure_stream(publisher.context()).await?;
    info!(url = %config.nats.url, "Connected to NATS");

    let products = Arc::new(PgProductRepository::new(pool.clone()));
    let reviews = Arc::new(PgReviewRepository::new(pool));
    let state = AppState::new(
        Arc::new(ProductService::new(products, cache.clone())),
        Arc::new(ReviewService::new(reviews, cache, publisher)),
    );

    let app = build_router(
        state,
        config.request_timeout(),
        &config.server.allowed_origins,
    );
    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
