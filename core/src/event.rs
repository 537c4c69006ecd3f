//! Review event wire format.
//!
//! Events are published as UTF-8 JSON on [`REVIEW_EVENTS_SUBJECT`]. The
//! review snapshot is informational only: consumers must rely on
//! `product_id` alone and recompute from authoritative state. Unknown fields
//! and unknown event kinds must not fail decoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::review::Review;

/// Subject the write service publishes review events on.
pub const REVIEW_EVENTS_SUBJECT: &str = "reviews.events";

/// What happened to the review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    /// A review was created.
    #[serde(rename = "review.created")]
    Created,
    /// A review was updated.
    #[serde(rename = "review.updated")]
    Updated,
    /// A review was soft-deleted.
    #[serde(rename = "review.deleted")]
    Deleted,
    /// A kind this consumer does not know. Still triggers a recompute for
    /// the product; never a decode failure.
    #[serde(rename = "review.unknown")]
    Other,
}

// Hand-written so future event kinds decode to `Other` instead of failing.
impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "review.created" => Self::Created,
            "review.updated" => Self::Updated,
            "review.deleted" => Self::Deleted,
            _ => Self::Other,
        })
    }
}

/// The envelope published for every review mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEvent {
    /// Event kind, e.g. `review.created`.
    pub event_type: EventKind,
    /// Wall-clock timestamp of the originating write (RFC-3339 UTC).
    pub timestamp: DateTime<Utc>,
    /// Owning product; the only field correctness depends on.
    pub product_id: Uuid,
    /// Informational snapshot of the review as of the write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
}

impl ReviewEvent {
    /// Build an event stamped with the current wall clock.
    #[must_use]
    pub fn new(event_type: EventKind, product_id: Uuid, review: Option<Review>) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            product_id,
            review,
        }
    }
}
