//! Stream and consumer provisioning for the review events work queue.

use std::time::Duration;

use async_nats::jetstream;
use async_nats::jetstream::consumer::{pull, AckPolicy};
use async_nats::jetstream::stream::{DiscardPolicy, RetentionPolicy, StorageType, Stream};

use catalog_core::{CatalogError, REVIEW_EVENTS_SUBJECT};

/// JetStream stream holding review events.
pub const STREAM_NAME: &str = "REVIEWS";

/// Durable consumer the rating worker attaches to.
pub const CONSUMER_NAME: &str = "rating-worker";

/// Delivery attempts before a message is discarded. There is no dead-letter
/// queue: the rating is recomputed from authoritative state on every
/// successful delivery, and any newer event for the same product triggers a
/// fresh full recompute.
pub const MAX_DELIVER: i64 = 3;

/// How long the broker waits for an ack before redelivering.
pub const ACK_WAIT: Duration = Duration::from_secs(30);

/// Messages older than this are dropped from the stream.
pub const MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Create the review events stream if it does not exist yet.
///
/// Work-queue retention, file storage, single replica, 24 h age bound,
/// discard-old. Idempotent across service restarts.
///
/// # Errors
///
/// Returns [`CatalogError::Bus`] when the broker rejects the configuration.
pub async fn ensure_stream(context: &jetstream::Context) -> Result<Stream, CatalogError> {
    let stream = context
        .get_or_create_stream(jetstream::stream::Config {
            name: STREAM_NAME.to_string(),
            subjects: vec![REVIEW_EVENTS_SUBJECT.to_string()],
            retention: RetentionPolicy::WorkQueue,
            storage: StorageType::File,
            num_replicas: 1,
            max_age: MAX_AGE,
            discard: DiscardPolicy::Old,
            description: Some("Review events stream for rating calculation".to_string()),
            ..Default::default()
        })
        .await
        .map_err(|e| CatalogError::Bus(format!("failed to ensure stream {STREAM_NAME}: {e}")))?;

    tracing::info!(stream = STREAM_NAME, subject = REVIEW_EVENTS_SUBJECT, "JetStream stream ready");
    Ok(stream)
}

/// Create the rating worker's durable pull consumer if it does not exist yet.
///
/// Explicit-ack policy with a 30 s ack wait, three deliveries and an
/// exponential 1 s / 2 s backoff between redeliveries.
///
/// # Errors
///
/// Returns [`CatalogError::Bus`] when the broker rejects the configuration.
pub async fn ensure_consumer(
    stream: &Stream,
) -> Result<jetstream::consumer::Consumer<pull::Config>, CatalogError> {
    let consumer = stream
        .get_or_create_consumer(
            CONSUMER_NAME,
            pull::Config {
                durable_name: Some(CONSUMER_NAME.to_string()),
                ack_policy: AckPolicy::Explicit,
                ack_wait: ACK_WAIT,
                max_deliver: MAX_DELIVER,
                backoff: vec![Duration::from_secs(1), Duration::from_secs(2)],
                filter_subject: REVIEW_EVENTS_SUBJECT.to_string(),
                description: Some(
                    "Rating worker consumer for processing review events".to_string(),
                ),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| CatalogError::Bus(format!("failed to ensure consumer {CONSUMER_NAME}: {e}")))?;

    tracing::info!(consumer = CONSUMER_NAME, "JetStream consumer ready");
    Ok(consumer)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Redelivery backoff doubles per attempt and stays shorter than the ack
    // wait, so a redelivery is never raced by its own timeout.
    #[test]
    fn backoff_doubles_and_stays_under_ack_wait() {
        let backoff = [Duration::from_secs(1), Duration::from_secs(2)];
        assert_eq!(backoff.len() as i64, MAX_DELIVER - 1);
        for (n, delay) in backoff.iter().enumerate() {
            assert_eq!(*delay, Duration::from_secs(1 << n));
            assert!(*delay < ACK_WAIT);
        }
    }
}
