//! Cancellable polling controllers
//!
//! A [`RefreshController`] wraps one API operation (a [`RefreshSource`]),
//! publishes the last successful result plus the last error through a
//! `watch` channel, and can run that operation on a repeating schedule.

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// One API operation a controller can poll
#[async_trait]
pub trait RefreshSource: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    /// Human-readable name used in log output
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> Result<Self::Output>;
}

/// State published by a controller after every change
#[derive(Clone, Debug, PartialEq)]
pub struct RefreshState<T> {
    /// Last successfully decoded result
    pub snapshot: Option<T>,
    /// True while a refresh or command is outstanding
    pub in_flight: bool,
    /// User-facing message of the most recent failure
    pub last_error: Option<String>,
    /// When `snapshot` was last replaced
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl<T> Default for RefreshState<T> {
    fn default() -> Self {
        Self {
            snapshot: None,
            in_flight: false,
            last_error: None,
            last_refreshed: None,
        }
    }
}

struct Shared<S: RefreshSource> {
    source: S,
    state: watch::Sender<RefreshState<S::Output>>,
    outstanding: AtomicUsize,
    teardown: CancellationToken,
}

impl<S: RefreshSource> Shared<S> {
    fn begin(&self) -> InFlight<'_, S> {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|state| state.in_flight = true);
        InFlight {
            shared: self,
            settled: false,
        }
    }

    fn settle_in_flight(&self) -> bool {
        self.outstanding.fetch_sub(1, Ordering::SeqCst).saturating_sub(1) > 0
    }

    async fn refresh_once(&self) -> bool {
        if self.teardown.is_cancelled() {
            return false;
        }

        let call = self.begin();
        let result = self.source.fetch().await;

        // Late results after teardown are dropped; the state stays frozen.
        if self.teardown.is_cancelled() {
            debug!("Discarding {} result after teardown", self.source.name());
            return false;
        }

        let replaced = result.is_ok();
        if let Err(e) = &result {
            warn!("Failed to refresh {}: {}", self.source.name(), e);
        }

        call.complete(|state| match result {
            Ok(value) => {
                state.snapshot = Some(value);
                state.last_error = None;
                state.last_refreshed = Some(Utc::now());
            }
            Err(e) => state.last_error = Some(e.to_string()),
        });

        replaced
    }

    fn record_error(&self, message: String) {
        if self.teardown.is_cancelled() {
            return;
        }
        self.state.send_modify(|state| state.last_error = Some(message));
    }
}

/// One outstanding call. Dropping it, even mid-request, settles `in_flight`.
struct InFlight<'a, S: RefreshSource> {
    shared: &'a Shared<S>,
    settled: bool,
}

impl<S: RefreshSource> InFlight<'_, S> {
    /// Settle the call and apply `update` in the same state change
    fn complete(mut self, update: impl FnOnce(&mut RefreshState<S::Output>)) {
        self.settled = true;
        let busy = self.shared.settle_in_flight();
        if self.shared.teardown.is_cancelled() {
            return;
        }
        self.shared.state.send_modify(|state| {
            state.in_flight = busy;
            update(state);
        });
    }
}

impl<S: RefreshSource> Drop for InFlight<'_, S> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let busy = self.shared.settle_in_flight();
        if !self.shared.teardown.is_cancelled() {
            self.shared.state.send_modify(|state| state.in_flight = busy);
        }
    }
}

/// Owns a polling schedule and the most recent result of one API operation.
///
/// Dropping the controller cancels its schedule. A request that is already in
/// flight is allowed to finish but its result is discarded.
pub struct RefreshController<S: RefreshSource> {
    id: String,
    shared: Arc<Shared<S>>,
    schedule: Option<CancellationToken>,
}

impl<S: RefreshSource> RefreshController<S> {
    pub fn new(source: S) -> Self {
        let (state, _) = watch::channel(RefreshState::default());

        Self {
            id: Uuid::new_v4().to_string(),
            shared: Arc::new(Shared {
                source,
                state,
                outstanding: AtomicUsize::new(0),
                teardown: CancellationToken::new(),
            }),
            schedule: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Copy of the current published state
    pub fn state(&self) -> RefreshState<S::Output> {
        self.shared.state.borrow().clone()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<RefreshState<S::Output>> {
        self.shared.state.subscribe()
    }

    /// Run the wrapped operation once. Returns true when the snapshot was replaced.
    ///
    /// Overlapping calls are not deduplicated.
    #[instrument(skip(self), fields(controller = %self.id, source = self.shared.source.name()))]
    pub async fn refresh_once(&self) -> bool {
        self.shared.refresh_once().await
    }

    /// Poll every `interval`, first tick one interval from now.
    ///
    /// Any schedule already running is cancelled first.
    #[instrument(skip(self), fields(controller = %self.id, source = self.shared.source.name()))]
    pub fn start_auto_refresh(&mut self, interval: Duration) {
        self.cancel_schedule();

        // interval_at panics on a zero period
        let period = interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let cancel = CancellationToken::new();
        self.schedule = Some(cancel.clone());

        let shared = Arc::clone(&self.shared);
        let id = self.id.clone();

        info!("Starting auto refresh of {} every {:?}", shared.source.name(), period);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = shared.teardown.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                shared.refresh_once().await;
            }

            debug!("Auto refresh loop for controller {} exited", id);
        });
    }

    /// Cancel future scheduled refreshes. An in-flight request still completes.
    pub fn stop(&mut self) {
        if self.cancel_schedule() {
            info!("Stopped auto refresh of {}", self.shared.source.name());
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.schedule
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Mark the controller busy while `fut` runs
    pub(crate) async fn while_busy<F: Future>(&self, fut: F) -> F::Output {
        let _call = self.shared.begin();
        fut.await
    }

    pub(crate) fn record_error(&self, message: String) {
        self.shared.record_error(message);
    }

    fn cancel_schedule(&mut self) -> bool {
        match self.schedule.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

impl<S: RefreshSource> Drop for RefreshController<S> {
    fn drop(&mut self) {
        self.cancel_schedule();
        self.shared.teardown.cancel();
    }
}
