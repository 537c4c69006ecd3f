//! Rating worker: consumes review events from the durable JetStream consumer
//! and keeps product average ratings in step with their live reviews.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use catalog_server::{init_tracing, shutdown_signal, Config, STARTUP_ATTEMPTS, STARTUP_DELAY};
use catalog_worker::{Debouncer, PgRatingCalculator, RatingWorker, DEBOUNCE_WINDOW};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = Config::from_env();

    info!("Starting rating worker");

    info!("Connecting to PostgreSQL");
    let pool = catalog_postgres::connect_with_retry(
        &config.database_url(),
        &config.pool_settings(),
        STARTUP_ATTEMPTS,
        STARTUP_DELAY,
    )
    .await?;
    info!("Connected to PostgreSQL");

    info!("Connecting to NATS");
    let client =
        catalog_bus::connect_with_retry(&config.nats.url, STARTUP_ATTEMPTS, STARTUP_DELAY).await?;
    let context = catalog_bus::jetstream_context(client);
    let stream = catalog_bus::ensure_stream(&context).await?;
    let consumer = catalog_bus::ensure_consumer(&stream).await?;
    info!(url = %config.nats.url, "Connected to NATS");

    let calculator = Arc::new(PgRatingCalculator::new(pool));
    let debouncer = Arc::new(Debouncer::new(calculator, DEBOUNCE_WINDOW));
    let worker = RatingWorker::new(consumer, Arc::clone(&debouncer));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    worker.run(shutdown_rx).await;

    debouncer.shutdown(config.server.shutdown_timeout).await?;

    info!("Rating worker stopped");
    Ok(())
}
