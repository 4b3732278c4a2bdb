use crate::broadcast::registry::{SessionInfo, SessionRegistry};
use crate::broadcast::render::{Renderer, FALLBACK_PAYLOAD};
use crate::broadcast::sink::PayloadSink;
use crate::state::{Aggregates, MetricsTracker, Snapshot, StateStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// When a session takes its next snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Fixed period per session, whether or not anything changed
    Interval(Duration),
    /// After every store change notification; bursts of merges coalesce
    OnChange,
}

impl Default for DeliveryMode {
    fn default() -> Self {
        DeliveryMode::Interval(Duration::from_millis(100))
    }
}

/// Why a session stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// Transport write failed or the peer went away
    Disconnected,
    Shutdown,
    /// The store's change notification closed
    StoreClosed,
}

enum Trigger {
    Interval(Interval),
    OnChange(watch::Receiver<u64>),
}

impl Trigger {
    /// Returns false once no further wake-ups can arrive
    async fn wait(&mut self) -> bool {
        match self {
            Trigger::Interval(ticker) => {
                ticker.tick().await;
                true
            }
            Trigger::OnChange(rx) => {
                if rx.changed().await.is_err() {
                    return false;
                }
                rx.borrow_and_update();
                true
            }
        }
    }
}

/// Deregisters a session however its loop exits, including cancellation
struct SessionGuard<'a> {
    id: Uuid,
    registry: &'a SessionRegistry,
    metrics: &'a MetricsTracker,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
        self.metrics.decrement_sessions();
    }
}

/// Fans consistent snapshots out to any number of subscriber sessions.
///
/// Each session runs its own loop on the caller's task: snapshot, aggregate,
/// render, write, wait. Sessions share nothing but the store, so one failing
/// subscriber never affects another.
pub struct BroadcastEngine {
    store: Arc<StateStore>,
    renderer: Arc<dyn Renderer>,
    mode: DeliveryMode,
    metrics: MetricsTracker,
    registry: SessionRegistry,
    shutdown_tx: watch::Sender<bool>,
}

impl BroadcastEngine {
    pub fn new(store: Arc<StateStore>, renderer: Arc<dyn Renderer>, mode: DeliveryMode) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            store,
            renderer,
            mode,
            metrics: MetricsTracker::new(),
            registry: SessionRegistry::new(),
            shutdown_tx,
        }
    }

    /// Share counters with the rest of the process
    pub fn with_metrics(mut self, metrics: MetricsTracker) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.registry.list()
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Aggregate and render one snapshot, substituting the fallback payload on error
    pub fn render(&self, snapshot: &Snapshot) -> Vec<u8> {
        let aggregates = Aggregates::compute(&snapshot.vehicles);
        match self.renderer.render(snapshot, &aggregates) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "couldn't render status, sending fallback");
                self.metrics.record_render_failure();
                FALLBACK_PAYLOAD.to_vec()
            }
        }
    }

    /// End every running session and refuse new ones
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        info!(sessions = self.registry.len(), "broadcast engine shutting down");
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    fn trigger(&self) -> Trigger {
        match self.mode {
            DeliveryMode::Interval(period) => {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Trigger::Interval(ticker)
            }
            DeliveryMode::OnChange => Trigger::OnChange(self.store.subscribe()),
        }
    }

    /// Run one subscriber session until its transport fails or the engine shuts down.
    ///
    /// The first snapshot is delivered immediately. The change subscription is
    /// taken before that first snapshot, so no merge can fall between the two.
    pub async fn run_session<S: PayloadSink>(&self, mut sink: S, peer: Option<String>) -> SessionEnd {
        let mut shutdown = self.shutdown_tx.subscribe();
        if *shutdown.borrow_and_update() {
            return SessionEnd::Shutdown;
        }

        let id = self.registry.register(peer.clone());
        self.metrics.increment_sessions();
        let _guard = SessionGuard {
            id,
            registry: &self.registry,
            metrics: &self.metrics,
        };
        info!(session = %id, peer = ?peer, mode = ?self.mode, "starting subscriber session");

        let mut trigger = self.trigger();

        let end = loop {
            let snapshot = self.store.snapshot();
            debug!(session = %id, len = snapshot.len(), generation = snapshot.generation, "acquired status data");
            let payload = self.render(&snapshot);

            tokio::select! {
                biased;
                _ = shutdown.changed() => break SessionEnd::Shutdown,
                result = sink.send(payload) => {
                    if let Err(e) = result {
                        info!(session = %id, error = %e, "subscriber write failed");
                        break SessionEnd::Disconnected;
                    }
                }
            }

            self.registry.record_delivery(&id, snapshot.generation);
            self.metrics.record_delivery();
            debug!(session = %id, "sent status update");

            tokio::select! {
                biased;
                _ = shutdown.changed() => break SessionEnd::Shutdown,
                _ = sink.closed() => break SessionEnd::Disconnected,
                woke = trigger.wait() => {
                    if !woke {
                        break SessionEnd::StoreClosed;
                    }
                }
            }
        };

        info!(session = %id, reason = ?end, "subscriber session ended");
        end
    }
}
