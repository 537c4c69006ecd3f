//! Rating worker for the product review catalog.
//!
//! The worker attaches to the durable JetStream consumer, pulls review
//! events in small batches, and coalesces them per product through an
//! in-memory debouncer. When a product's debounce window closes, the
//! average rating is recomputed from authoritative database state with a
//! bounded retry, then written under the product row's version counter.
//!
//! A worker crash between ack and recompute can lose that one event; this is
//! accepted because recomputes read current state, so any later event for the
//! same product repairs the rating in full.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::time::Duration;

mod calculator;
mod debounce;
mod worker;

pub use calculator::{PgRatingCalculator, RatingCalculator};
pub use debounce::{Debouncer, ScheduleOutcome, ShutdownTimeout};
pub use worker::RatingWorker;

/// Events for the same product arriving within this window collapse into one
/// recompute.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

/// Recompute attempts per firing before giving up.
pub const MAX_ATTEMPTS: u32 = 3;

/// Backoff before the first retry; doubles per attempt.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Per-attempt budget for the recompute statement.
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on messages pulled per fetch.
pub const FETCH_BATCH: usize = 10;

/// How long a fetch waits for messages before returning empty.
pub const FETCH_WAIT: Duration = Duration::from_secs(5);
