//! Per-product debouncing of rating recomputes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use catalog_core::CatalogError;

use crate::calculator::RatingCalculator;
use crate::{ATTEMPT_TIMEOUT, INITIAL_BACKOFF, MAX_ATTEMPTS};

/// Shutdown did not drain the in-flight recomputes within the deadline.
#[derive(Debug, Error)]
#[error("shutdown deadline exceeded")]
pub struct ShutdownTimeout;

/// What `schedule` did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// First event for the product; a timer was armed.
    Armed,
    /// An armed timer existed; it was reset for a fresh window.
    Coalesced,
    /// The event is strictly older than the one already pending; dropped.
    Stale,
    /// The worker is shutting down; nothing was scheduled.
    ShuttingDown,
}

/// Coalesces bursts of events per product into a single recompute.
///
/// At most one pending update exists per product at any instant. Scheduling
/// an event for a product with an armed timer resets
/// the timer (a fresh debounce window) unless the event's timestamp is
/// strictly older than the stored one, in which case it is dropped as stale.
/// Ties keep the stored entry and still reset the timer.
///
/// The map mutex guards O(1) bookkeeping only and is never held across an
/// await point.
pub struct Debouncer {
    inner: Arc<Inner>,
    done_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

struct Inner {
    window: Duration,
    calculator: Arc<dyn RatingCalculator>,
    state: Mutex<DebounceState>,
    cancel: watch::Sender<bool>,
    done_tx: Mutex<Option<mpsc::Sender<()>>>,
    generation: AtomicU64,
}

struct DebounceState {
    pending: HashMap<Uuid, PendingUpdate>,
    shutting_down: bool,
}

/// An armed timer for one product: the latest observed event timestamp and
/// the handle to stop the scheduled fire. Owned solely by its map slot.
struct PendingUpdate {
    timestamp: DateTime<Utc>,
    generation: u64,
    handle: JoinHandle<()>,
}

impl Debouncer {
    /// Build a debouncer firing `window` after the latest event.
    #[must_use]
    pub fn new(calculator: Arc<dyn RatingCalculator>, window: Duration) -> Self {
        let (cancel, _) = watch::channel(false);
        let (done_tx, done_rx) = mpsc::channel(1);

        Self {
            inner: Arc::new(Inner {
                window,
                calculator,
                state: Mutex::new(DebounceState {
                    pending: HashMap::new(),
                    shutting_down: false,
                }),
                cancel,
                done_tx: Mutex::new(Some(done_tx)),
                generation: AtomicU64::new(0),
            }),
            done_rx: Mutex::new(Some(done_rx)),
        }
    }

    /// Record an event for a product, arming or resetting its timer.
    pub fn schedule(&self, product_id: Uuid, timestamp: DateTime<Utc>) -> ScheduleOutcome {
        let done = {
            let guard = self.inner.done_tx.lock().expect("debouncer lock poisoned");
            match guard.as_ref() {
                Some(tx) => tx.clone(),
                None => return ScheduleOutcome::ShuttingDown,
            }
        };

        let mut state = self.inner.state.lock().expect("debouncer lock poisoned");
        if state.shutting_down {
            tracing::info!(%product_id, "Worker shutting down, ignoring new event");
            return ScheduleOutcome::ShuttingDown;
        }

        let outcome = match state.pending.get(&product_id) {
            Some(existing) if timestamp < existing.timestamp => {
                tracing::debug!(
                    %product_id,
                    existing_ts = %existing.timestamp,
                    event_ts = %timestamp,
                    "Ignoring stale event"
                );
                return ScheduleOutcome::Stale;
            }
            Some(_) => ScheduleOutcome::Coalesced,
            None => ScheduleOutcome::Armed,
        };

        if let Some(existing) = state.pending.remove(&product_id) {
            existing.handle.abort();
            tracing::debug!(%product_id, "Debouncing: resetting timer for product");
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let handle = tokio::spawn(Arc::clone(&self.inner).fire(product_id, generation, done));
        state.pending.insert(
            product_id,
            PendingUpdate {
                timestamp,
                generation,
                handle,
            },
        );

        outcome
    }

    /// Number of armed timers, for monitoring and tests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .expect("debouncer lock poisoned")
            .pending
            .len()
    }

    /// Drain the debouncer: reject new work, abort retry sleeps, cancel every
    /// armed timer, then wait for recomputes already past their timer.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownTimeout`] when in-flight recomputes do not finish
    /// within `deadline`; timers that had not fired are cancelled either way.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), ShutdownTimeout> {
        tracing::info!("Shutting down rating debouncer");

        self.inner
            .state
            .lock()
            .expect("debouncer lock poisoned")
            .shutting_down = true;

        // send_replace stores the value even with no live receivers, so a
        // recompute that subscribes after this point still observes it.
        self.inner.cancel.send_replace(true);

        let cancelled = {
            let mut state = self.inner.state.lock().expect("debouncer lock poisoned");
            let cancelled = state.pending.len();
            for (_, update) in state.pending.drain() {
                update.handle.abort();
            }
            cancelled
        };
        tracing::info!(cancelled_updates = cancelled, "Cancelled pending updates");

        // Dropping the root sender lets recv() observe channel closure once
        // every in-flight task has dropped its clone.
        drop(self.inner.done_tx.lock().expect("debouncer lock poisoned").take());
        let Some(mut done_rx) = self.done_rx.lock().expect("debouncer lock poisoned").take()
        else {
            return Ok(());
        };

        match tokio::time::timeout(deadline, done_rx.recv()).await {
            Ok(_) => {
                tracing::info!("All in-flight rating updates completed");
                Ok(())
            }
            Err(_) => {
                tracing::warn!("Shutdown deadline reached, forcing exit");
                Err(ShutdownTimeout)
            }
        }
    }
}

impl Inner {
    /// Timer body: wait out the window, claim the map entry, recompute.
    async fn fire(self: Arc<Self>, product_id: Uuid, generation: u64, done: mpsc::Sender<()>) {
        // Held until the task finishes or is aborted; shutdown waits on it.
        let _done = done;

        tokio::time::sleep(self.window).await;

        let claimed = {
            let mut state = self.state.lock().expect("debouncer lock poisoned");
            // A mismatched generation means a newer schedule replaced this
            // timer between the sleep and the claim; the replacement owns
            // the recompute.
            let owns_entry = state
                .pending
                .get(&product_id)
                .is_some_and(|update| update.generation == generation);
            if owns_entry {
                state.pending.remove(&product_id);
            }
            owns_entry
        };

        if claimed {
            self.recompute_with_retry(product_id).await;
        }
    }

    async fn recompute_with_retry(&self, product_id: Uuid) {
        tracing::info!(%product_id, "Processing rating update");

        let mut cancel = self.cancel.subscribe();
        let mut backoff = INITIAL_BACKOFF;
        let mut last_error: Option<CatalogError> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            if *cancel.borrow() {
                tracing::debug!(%product_id, "Shutdown requested, aborting rating update");
                return;
            }

            if attempt > 1 {
                tracing::warn!(
                    %product_id,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "Retrying rating update"
                );
                tokio::select! {
                    () = tokio::time::sleep(backoff) => {}
                    _ = cancel.changed() => {
                        tracing::debug!(%product_id, "Shutdown requested, aborting retry");
                        return;
                    }
                }
                backoff *= 2;
            }

            match tokio::time::timeout(ATTEMPT_TIMEOUT, self.calculator.recompute(product_id)).await
            {
                Ok(Ok(())) => {
                    metrics::counter!("rating_worker_recomputes", "result" => "success")
                        .increment(1);
                    return;
                }
                Ok(Err(err)) => {
                    tracing::error!(%product_id, attempt, error = %err, "Failed to update rating");
                    last_error = Some(err);
                }
                Err(_) => {
                    tracing::error!(%product_id, attempt, "Rating update attempt timed out");
                    last_error = Some(CatalogError::Storage("attempt timed out".to_string()));
                }
            }
        }

        metrics::counter!("rating_worker_recomputes", "result" => "failure").increment(1);
        tracing::error!(
            %product_id,
            max_attempts = MAX_ATTEMPTS,
            error = %last_error.unwrap_or_else(|| CatalogError::Storage("unknown".to_string())),
            "Rating update failed after all retries"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    const WINDOW: Duration = Duration::from_millis(50);

    /// Calculator recording calls, failing the first `fail_times` of them and
    /// optionally holding each call for `delay`.
    #[derive(Default)]
    struct MockCalculator {
        calls: Mutex<Vec<Uuid>>,
        fail_times: AtomicUsize,
        delay: Mutex<Option<Duration>>,
    }

    impl MockCalculator {
        fn calls(&self) -> Vec<Uuid> {
            self.calls.lock().unwrap().clone()
        }

        fn fail_times(&self, n: usize) {
            self.fail_times.store(n, Ordering::SeqCst);
        }

        fn delay_each_call(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }
    }

    #[async_trait]
    impl RatingCalculator for MockCalculator {
        async fn recompute(&self, product_id: Uuid) -> Result<(), CatalogError> {
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.calls.lock().unwrap().push(product_id);
            if self
                .fail_times
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(CatalogError::Storage("simulated failure".to_string()));
            }
            Ok(())
        }
    }

    fn setup() -> (Arc<MockCalculator>, Debouncer) {
        let calculator = Arc::new(MockCalculator::default());
        let debouncer = Debouncer::new(calculator.clone(), WINDOW);
        (calculator, debouncer)
    }

    async fn drain(debouncer: &Debouncer) {
        debouncer
            .shutdown(Duration::from_secs(5))
            .await
            .expect("drain should finish");
    }

    #[tokio::test]
    async fn burst_for_one_product_coalesces_into_one_recompute() {
        let (calculator, debouncer) = setup();
        let product_id = Uuid::new_v4();

        for _ in 0..10 {
            let outcome = debouncer.schedule(product_id, Utc::now());
            assert_ne!(outcome, ScheduleOutcome::ShuttingDown);
        }
        assert_eq!(debouncer.pending_count(), 1);

        tokio::time::sleep(WINDOW * 4).await;

        assert_eq!(calculator.calls(), vec![product_id]);
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[tokio::test]
    async fn stale_event_is_dropped() {
        let (calculator, debouncer) = setup();
        let product_id = Uuid::new_v4();
        let now = Utc::now();

        assert_eq!(
            debouncer.schedule(product_id, now + chrono::Duration::seconds(10)),
            ScheduleOutcome::Armed
        );
        assert_eq!(
            debouncer.schedule(product_id, now),
            ScheduleOutcome::Stale
        );
        assert_eq!(debouncer.pending_count(), 1);

        tokio::time::sleep(WINDOW * 4).await;
        assert_eq!(calculator.calls(), vec![product_id]);
    }

    #[tokio::test]
    async fn equal_timestamps_reset_the_timer_instead_of_dropping() {
        let (_calculator, debouncer) = setup();
        let product_id = Uuid::new_v4();
        let now = Utc::now();

        assert_eq!(debouncer.schedule(product_id, now), ScheduleOutcome::Armed);
        assert_eq!(
            debouncer.schedule(product_id, now),
            ScheduleOutcome::Coalesced
        );
    }

    #[tokio::test]
    async fn products_debounce_independently() {
        let (calculator, debouncer) = setup();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        for &id in &ids {
            debouncer.schedule(id, Utc::now());
        }
        assert_eq!(debouncer.pending_count(), 3);

        tokio::time::sleep(WINDOW * 4).await;

        let mut calls = calculator.calls();
        calls.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(calls, expected);
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_cancels_timers_that_have_not_fired() {
        let (calculator, debouncer) = setup();
        let product_id = Uuid::new_v4();

        debouncer.schedule(product_id, Utc::now());
        assert_eq!(debouncer.pending_count(), 1);

        debouncer
            .shutdown(Duration::from_secs(1))
            .await
            .expect("shutdown should finish");

        assert_eq!(debouncer.pending_count(), 0);
        assert!(calculator.calls().is_empty());
        assert_eq!(
            debouncer.schedule(product_id, Utc::now()),
            ScheduleOutcome::ShuttingDown
        );
    }

    #[tokio::test]
    async fn shutdown_waits_for_a_recompute_already_past_its_timer() {
        let (calculator, debouncer) = setup();
        calculator.delay_each_call(Duration::from_millis(150));
        let product_id = Uuid::new_v4();

        debouncer.schedule(product_id, Utc::now());
        // Let the timer fire so the recompute is in flight.
        tokio::time::sleep(WINDOW + Duration::from_millis(20)).await;
        assert_eq!(debouncer.pending_count(), 0);

        debouncer
            .shutdown(Duration::from_secs(2))
            .await
            .expect("shutdown should wait for the in-flight update");
        assert_eq!(calculator.calls(), vec![product_id]);
    }

    #[tokio::test]
    async fn shutdown_reports_deadline_exceeded() {
        let (calculator, debouncer) = setup();
        calculator.delay_each_call(Duration::from_millis(300));
        let product_id = Uuid::new_v4();

        debouncer.schedule(product_id, Utc::now());
        tokio::time::sleep(WINDOW + Duration::from_millis(20)).await;

        let result = debouncer.shutdown(Duration::from_millis(50)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn recompute_retries_until_success() {
        let (calculator, debouncer) = setup();
        calculator.fail_times(2);
        let product_id = Uuid::new_v4();

        debouncer.schedule(product_id, Utc::now());
        // Window plus two backoffs (100 ms + 200 ms) with margin.
        tokio::time::sleep(WINDOW + Duration::from_millis(600)).await;

        assert_eq!(calculator.calls().len(), 3);
        drain(&debouncer).await;
    }

    #[tokio::test]
    async fn exhausted_retries_give_up_until_the_next_event() {
        let (calculator, debouncer) = setup();
        calculator.fail_times(MAX_ATTEMPTS as usize);
        let product_id = Uuid::new_v4();

        debouncer.schedule(product_id, Utc::now());
        tokio::time::sleep(WINDOW + Duration::from_millis(600)).await;
        assert_eq!(calculator.calls().len(), MAX_ATTEMPTS as usize);

        // A fresh event recomputes from scratch and now succeeds.
        debouncer.schedule(product_id, Utc::now());
        tokio::time::sleep(WINDOW * 4).await;
        assert_eq!(calculator.calls().len(), MAX_ATTEMPTS as usize + 1);

        drain(&debouncer).await;
    }
}
