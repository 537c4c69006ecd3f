//! Fetch loop attaching the debouncer to the durable consumer.

use std::sync::Arc;

use async_nats::jetstream::consumer::{pull, Consumer};
use async_nats::jetstream::AckKind;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::watch;
use uuid::Uuid;

use catalog_core::EventKind;

use crate::debounce::{Debouncer, ScheduleOutcome};
use crate::{FETCH_BATCH, FETCH_WAIT};

/// The slice of the event envelope the worker relies on. The review snapshot
/// is informational and never authoritative, so it is not decoded at all;
/// extra fields from newer producers are ignored.
#[derive(Debug, Deserialize)]
struct EventEnvelope {
    event_type: EventKind,
    product_id: Uuid,
    timestamp: DateTime<Utc>,
}

/// Pulls review events in batches and feeds them to the debouncer.
///
/// Messages are acked as soon as the debouncer owns the work; from then on
/// correctness rests on the idempotent recompute, not on redelivery. A
/// malformed payload is nak'd so the broker redelivers it up to the
/// consumer's max-deliver and then drops it.
pub struct RatingWorker {
    consumer: Consumer<pull::Config>,
    debouncer: Arc<Debouncer>,
}

impl RatingWorker {
    /// Attach a debouncer to a provisioned durable consumer.
    #[must_use]
    pub const fn new(consumer: Consumer<pull::Config>, debouncer: Arc<Debouncer>) -> Self {
        Self {
            consumer,
            debouncer,
        }
    }

    /// The worker's debouncer, for shutdown and monitoring.
    #[must_use]
    pub const fn debouncer(&self) -> &Arc<Debouncer> {
        &self.debouncer
    }

    /// Fetch and process batches until the shutdown signal fires.
    ///
    /// Empty fetches are expected (the wait just elapses), and fetch errors
    /// back off briefly instead of tearing the loop down.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Rating worker consuming review events");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let fetch = tokio::select! {
                _ = shutdown.changed() => break,
                fetch = self
                    .consumer
                    .fetch()
                    .max_messages(FETCH_BATCH)
                    .expires(FETCH_WAIT)
                    .messages() => fetch,
            };

            let mut messages = match fetch {
                Ok(messages) => messages,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to fetch from consumer");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    continue;
                }
            };

            while let Some(message) = messages.next().await {
                match message {
                    Ok(message) => self.handle_message(message).await,
                    Err(err) => {
                        tracing::error!(error = %err, "Failed to receive message from batch");
                        break;
                    }
                }
            }
        }

        tracing::info!("Rating worker fetch loop stopped");
    }

    async fn handle_message(&self, message: async_nats::jetstream::Message) {
        metrics::counter!("rating_worker_events_received").increment(1);

        let event: EventEnvelope = match serde_json::from_slice(&message.payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "Malformed review event, nacking");
                if let Err(err) = message.ack_with(AckKind::Nak(None)).await {
                    tracing::warn!(error = %err, "Failed to nak message");
                }
                return;
            }
        };

        tracing::debug!(
            kind = ?event.event_type,
            product_id = %event.product_id,
            timestamp = %event.timestamp,
            "Received review event"
        );

        let outcome = self.debouncer.schedule(event.product_id, event.timestamp);
        if should_ack(outcome) {
            if let Err(err) = message.ack().await {
                tracing::warn!(
                    product_id = %event.product_id,
                    error = %err,
                    "Failed to ack message"
                );
            }
        } else {
            // Left unacked: ack-wait hands it to the next worker instance.
            tracing::info!(
                product_id = %event.product_id,
                "Shutting down, leaving event for redelivery"
            );
        }
    }
}

/// Every scheduled outcome acks: armed and coalesced events are owned by the
/// debouncer, and a stale event is superseded by the pending newer recompute.
/// Only a schedule rejected by shutdown leaves the message for redelivery.
const fn should_ack(outcome: ScheduleOutcome) -> bool {
    !matches!(outcome, ScheduleOutcome::ShuttingDown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_shutdown_skips_the_ack() {
        assert!(should_ack(ScheduleOutcome::Armed));
        assert!(should_ack(ScheduleOutcome::Coalesced));
        assert!(should_ack(ScheduleOutcome::Stale));
        assert!(!should_ack(ScheduleOutcome::ShuttingDown));
    }

    #[test]
    fn envelope_decodes_without_touching_the_snapshot() {
        // The snapshot can take any shape; only the routing fields matter.
        let event: EventEnvelope = serde_json::from_str(
            r#"{"event_type":"review.created",
                "timestamp":"2024-03-01T12:00:00Z",
                "product_id":"7f2c1a44-9b1e-4d7a-8a25-0e6a1f1c2d3e",
                "review":{"entirely":"unexpected"}}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, EventKind::Created);
        assert_eq!(
            event.product_id.to_string(),
            "7f2c1a44-9b1e-4d7a-8a25-0e6a1f1c2d3e"
        );
    }

    #[test]
    fn unknown_event_kinds_decode_and_would_schedule() {
        let event: EventEnvelope = serde_json::from_str(
            r#"{"event_type":"review.flagged",
                "timestamp":"2024-03-01T12:00:00Z",
                "product_id":"7f2c1a44-9b1e-4d7a-8a25-0e6a1f1c2d3e"}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, EventKind::Other);
    }

    #[test]
    fn missing_routing_fields_fail_decode() {
        let result = serde_json::from_str::<EventEnvelope>(
            r#"{"event_type":"review.created","timestamp":"2024-03-01T12:00:00Z"}"#,
        );
        assert!(result.is_err());
    }
}
