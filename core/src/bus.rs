//! Event bus seam implemented by the NATS crate.

use async_trait::async_trait;

use crate::error::CatalogError;

/// Durable event publication.
///
/// `publish` must return only after the bus has committed the message
/// (publish-with-ack); at-least-once delivery to consumers follows from the
/// stream's retention and redelivery policy.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a payload on a subject and wait for the bus acknowledgment.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), CatalogError>;
}
