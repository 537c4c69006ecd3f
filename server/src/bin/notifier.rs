//! Demo consumer: subscribes to review events over plain NATS and
//! pretty-prints each envelope. Shows a second consumer relying only on the
//! documented wire contract.

use futures::StreamExt;
use tracing::{info, warn};

use catalog_core::REVIEW_EVENTS_SUBJECT;
use catalog_server::{init_tracing, shutdown_signal, Config, STARTUP_ATTEMPTS, STARTUP_DELAY};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = Config::from_env();

    info!("Starting notifier service");

    let client =
        catalog_bus::connect_with_retry(&config.nats.url, STARTUP_ATTEMPTS, STARTUP_DELAY).await?;
    let mut subscription = client.subscribe(REVIEW_EVENTS_SUBJECT).await?;
    info!(subject = REVIEW_EVENTS_SUBJECT, "Listening for review events");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            message = subscription.next() => {
                let Some(message) = message else { break };
                match serde_json::from_slice::<serde_json::Value>(&message.payload) {
                    Ok(event) => {
                        let pretty = serde_json::to_string_pretty(&event)
                            .unwrap_or_else(|_| event.to_string());
                        info!("Received event:\n{pretty}");
                    }
                    Err(err) => {
                        warn!(error = %err, "Received undecodable event");
                    }
                }
            }
        }
    }

    info!("Notifier stopped");
    Ok(())
}
