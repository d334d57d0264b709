//! Shared device-state cache with observer fan-out and a pausable poller.
//!
//! One [`SpaCache`] sits between a [`SpaClient`] and any number of
//! [`Observer`]s. Every refresh replaces the cached [`SpaState`] wholesale and
//! then notifies observers in registration order. Write-path callers pause the
//! background poller around their command sequence so no timer-driven refresh
//! lands between their command and its verification.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::client::SpaClient;
use crate::diff::state_events;
use crate::types::{Event, SpaState};
use crate::Result;

/// Something that re-reads the cached state whenever it changes.
pub trait Observer: Send + Sync {
    fn on_state_changed(&self, state: Option<&SpaState>) -> Result<()>;
}

impl<F> Observer for F
where
    F: Fn(Option<&SpaState>) -> Result<()> + Send + Sync,
{
    fn on_state_changed(&self, state: Option<&SpaState>) -> Result<()> {
        self(state)
    }
}

/// What a failed refresh does to the cached state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshFailurePolicy {
    /// Drop the cached state; observers see the spa as unknown.
    #[default]
    Discard,
    /// Keep the last good state.
    KeepStale,
}

type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
struct Poller {
    interval: Option<Duration>,
    stop: Option<oneshot::Sender<()>>,
}

struct CacheInner {
    client: Arc<SpaClient>,
    policy: RefreshFailurePolicy,
    state: RwLock<Option<Arc<SpaState>>>,
    subscribers: RwLock<Vec<Arc<dyn Observer>>>,
    event_callbacks: RwLock<Vec<EventCallback>>,
    poller: Mutex<Poller>,
}

/// Cheap to clone; clones share the same state, subscribers and poller.
#[derive(Clone)]
pub struct SpaCache {
    inner: Arc<CacheInner>,
}

impl SpaCache {
    pub fn new(client: Arc<SpaClient>, policy: RefreshFailurePolicy) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                client,
                policy,
                state: RwLock::new(None),
                subscribers: RwLock::new(Vec::new()),
                event_callbacks: RwLock::new(Vec::new()),
                poller: Mutex::new(Poller::default()),
            }),
        }
    }

    pub fn client(&self) -> &Arc<SpaClient> {
        &self.inner.client
    }

    pub fn policy(&self) -> RefreshFailurePolicy {
        self.inner.policy
    }

    /// Current canonical state, `None` before the first successful refresh
    /// or after a failed one under [`RefreshFailurePolicy::Discard`].
    pub fn data(&self) -> Option<Arc<SpaState>> {
        self.inner.state.read().clone()
    }

    /// Append an observer. No dedup; observers stay registered for the cache's lifetime.
    pub fn register_subscriber(&self, observer: Arc<dyn Observer>) {
        self.inner.subscribers.write().push(observer);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// Register a callback for typed change events between consecutive states.
    pub fn on_event(&self, f: impl Fn(&Event) + Send + Sync + 'static) {
        self.inner.event_callbacks.write().push(Arc::new(f));
    }

    /// Fetch the dashboard, replace the cached state and notify every observer.
    /// Returns what the cache holds afterwards.
    pub async fn refresh(&self) -> Option<Arc<SpaState>> {
        self.refresh_with_outcome().await.0
    }

    /// Like [`refresh`](Self::refresh) but reports why the fetch failed.
    /// The failure policy and notifications apply either way.
    pub async fn try_refresh(&self) -> Result<Arc<SpaState>> {
        self.refresh_with_outcome().await.1
    }

    async fn refresh_with_outcome(&self) -> (Option<Arc<SpaState>>, Result<Arc<SpaState>>) {
        let fetched = self.inner.client.fetch_state().await;

        let (previous, current, outcome) = {
            let mut slot = self.inner.state.write();
            let previous = slot.clone();
            let outcome = match fetched {
                Ok(state) => {
                    let state = Arc::new(state);
                    *slot = Some(state.clone());
                    Ok(state)
                }
                Err(e) => {
                    match self.inner.policy {
                        RefreshFailurePolicy::Discard => {
                            warn!(kind = ?e.kind(), "refresh failed, clearing cached state: {e}");
                            *slot = None;
                        }
                        RefreshFailurePolicy::KeepStale => {
                            warn!(kind = ?e.kind(), "refresh failed, keeping last state: {e}");
                        }
                    }
                    Err(e)
                }
            };
            (previous, slot.clone(), outcome)
        };

        self.dispatch_events(previous.as_deref(), current.as_deref());
        self.notify_subscribers(current.as_deref());
        (current, outcome)
    }

    /// Same as [`refresh`](Self::refresh); called by observers right after a command.
    pub async fn force_refresh(&self) -> Option<Arc<SpaState>> {
        self.refresh().await
    }

    fn dispatch_events(&self, previous: Option<&SpaState>, current: Option<&SpaState>) {
        let callbacks = self.inner.event_callbacks.read().clone();
        if callbacks.is_empty() {
            return;
        }
        let events = state_events(previous, current);
        for event in &events {
            for cb in &callbacks {
                if catch_unwind(AssertUnwindSafe(|| cb(event))).is_err() {
                    error!(?event, "event callback panicked");
                }
            }
        }
        if !events.is_empty() {
            debug!(count = events.len(), "dispatched state events");
        }
    }

    fn notify_subscribers(&self, state: Option<&SpaState>) {
        let subscribers = self.inner.subscribers.read().clone();
        for (index, observer) in subscribers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| observer.on_state_changed(state))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(subscriber = index, "subscriber update failed: {e}"),
                Err(_) => error!(subscriber = index, "subscriber panicked during update"),
            }
        }
        trace!(count = subscribers.len(), "subscribers notified");
    }

    // -- Periodic refresh --

    /// Start refreshing every `interval`; the first tick fires one interval from now.
    /// Replaces a running poller. Must be called inside a tokio runtime.
    pub fn start_periodic_refresh(&self, interval: Duration) {
        let mut poller = self.inner.poller.lock();
        if let Some(stop) = poller.stop.take() {
            let _ = stop.send(());
        }
        poller.interval = Some(interval);
        poller.stop = Some(self.spawn_poller(interval));
        info!(interval_secs = interval.as_secs_f64(), "periodic refresh started");
    }

    /// Stop the poller. Returns `false` when it was not running.
    /// An in-flight refresh completes; only future ticks are cancelled.
    pub fn pause_updates(&self) -> bool {
        match self.inner.poller.lock().stop.take() {
            Some(stop) => {
                let _ = stop.send(());
                debug!("periodic refresh paused");
                true
            }
            None => false,
        }
    }

    /// Restart the poller at the stored interval. Returns `false` when it was
    /// already running or was never started.
    pub fn resume_updates(&self) -> bool {
        let mut poller = self.inner.poller.lock();
        if poller.stop.is_some() {
            return false;
        }
        let Some(interval) = poller.interval else {
            debug!("resume requested but no refresh interval configured");
            return false;
        };
        poller.stop = Some(self.spawn_poller(interval));
        debug!("periodic refresh resumed");
        true
    }

    pub fn is_updating(&self) -> bool {
        self.inner.poller.lock().stop.is_some()
    }

    pub fn polling_interval(&self) -> Option<Duration> {
        self.inner.poller.lock().interval
    }

    /// Stop the poller for good; a later `resume_updates` does nothing.
    pub fn shutdown(&self) {
        let mut poller = self.inner.poller.lock();
        if let Some(stop) = poller.stop.take() {
            let _ = stop.send(());
        }
        poller.interval = None;
        info!("periodic refresh shut down");
    }

    fn spawn_poller(&self, interval: Duration) -> oneshot::Sender<()> {
        let (stop_tx, stop_rx) = oneshot::channel();
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(run_poller(weak, interval, stop_rx));
        stop_tx
    }
}

async fn run_poller(weak: Weak<CacheInner>, interval: Duration, mut stop: oneshot::Receiver<()>) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = ticker.tick() => {}
        }
        let Some(inner) = weak.upgrade() else {
            break;
        };
        trace!("periodic refresh tick");
        SpaCache { inner }.refresh().await;
    }
    debug!("poller exited");
}
