//! NATS JetStream event bus for the product review catalog.
//!
//! Review events flow through one work-queue stream: a message is removed
//! once the durable consumer acknowledges it or once it exhausts its
//! deliveries. Storage is file-backed so events survive broker and worker
//! restarts; messages older than 24 hours are dropped because a stale
//! recompute adds nothing, since the worker always reads current database state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::time::Duration;

use async_nats::jetstream;
use async_trait::async_trait;

use catalog_core::{CatalogError, EventPublisher};

mod stream;

pub use stream::{
    ensure_consumer, ensure_stream, ACK_WAIT, CONSUMER_NAME, MAX_AGE, MAX_DELIVER, STREAM_NAME,
};

/// Connect to a NATS server.
///
/// # Errors
///
/// Returns [`CatalogError::Bus`] when the server is unreachable.
pub async fn connect(url: &str) -> Result<async_nats::Client, CatalogError> {
    async_nats::connect(url)
        .await
        .map_err(|e| CatalogError::Bus(format!("failed to connect to NATS at {url}: {e}")))
}

/// Connect to NATS, retrying while the server comes up.
///
/// # Errors
///
/// Returns the last connection error once every attempt is exhausted.
pub async fn connect_with_retry(
    url: &str,
    max_attempts: u32,
    delay: Duration,
) -> Result<async_nats::Client, CatalogError> {
    let mut last_err = CatalogError::Bus("no connection attempt made".to_string());

    for attempt in 1..=max_attempts {
        match connect(url).await {
            Ok(client) => return Ok(client),
            Err(err) => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    error = %err,
                    "NATS not ready, retrying"
                );
                last_err = err;
                if attempt < max_attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(last_err)
}

/// JetStream context over an established connection, for stream provisioning
/// and consumer attachment.
#[must_use]
pub fn jetstream_context(client: async_nats::Client) -> jetstream::Context {
    jetstream::new(client)
}

/// [`EventPublisher`] backed by a JetStream context.
///
/// `publish` resolves only after the broker acknowledges the message, so a
/// successful return means the event is committed to the stream.
#[derive(Clone)]
pub struct JetStreamPublisher {
    context: jetstream::Context,
}

impl JetStreamPublisher {
    /// Build a publisher over an established NATS connection.
    #[must_use]
    pub fn new(client: async_nats::Client) -> Self {
        Self {
            context: jetstream::new(client),
        }
    }

    /// The underlying JetStream context, for stream provisioning.
    #[must_use]
    pub const fn context(&self) -> &jetstream::Context {
        &self.context
    }
}

#[async_trait]
impl EventPublisher for JetStreamPublisher {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), CatalogError> {
        let ack = self
            .context
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| CatalogError::Bus(format!("publish to {subject} failed: {e}")))?;

        // The first await only queues the message; the returned future
        // resolves once the broker has committed it.
        ack.await
            .map_err(|e| CatalogError::Bus(format!("publish ack on {subject} failed: {e}")))?;

        tracing::debug!(subject, "Published event");
        Ok(())
    }
}
