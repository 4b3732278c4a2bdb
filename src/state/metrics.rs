use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Upper bounds of the ingestion latency histogram (seconds)
pub const LATENCY_BUCKETS_SECONDS: [f64; 8] = [
    0.000_001, 0.000_01, 0.000_1, 0.001, 0.01, 0.1, 1.0, 10.0,
];

/// Process counters for ingestion and subscriber delivery
#[derive(Clone)]
pub struct MetricsTracker {
    /// Ingestion requests received (lifetime counter)
    requests_received: Arc<AtomicU64>,

    /// Ingestion requests that reached the store
    requests_completed: Arc<AtomicU64>,

    /// Per-bucket counts; the extra slot is the +Inf bucket
    latency_buckets: Arc<[AtomicU64; 9]>,

    /// Total ingestion processing time (nanoseconds)
    latency_sum_nanos: Arc<AtomicU64>,

    /// Live subscriber sessions
    active_sessions: Arc<AtomicU64>,

    /// Payloads written to subscribers
    deliveries: Arc<AtomicU64>,

    /// Renders that fell back to the error payload
    render_failures: Arc<AtomicU64>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            requests_received: Arc::new(AtomicU64::new(0)),
            requests_completed: Arc::new(AtomicU64::new(0)),
            latency_buckets: Arc::new(Default::default()),
            latency_sum_nanos: Arc::new(AtomicU64::new(0)),
            active_sessions: Arc::new(AtomicU64::new(0)),
            deliveries: Arc::new(AtomicU64::new(0)),
            render_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_request(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished ingestion request and its processing time
    pub fn record_completed(&self, elapsed: Duration) {
        self.requests_completed.fetch_add(1, Ordering::Relaxed);

        let seconds = elapsed.as_secs_f64();
        let bucket = LATENCY_BUCKETS_SECONDS
            .iter()
            .position(|&bound| seconds <= bound)
            .unwrap_or(LATENCY_BUCKETS_SECONDS.len());
        self.latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);

        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.latency_sum_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn increment_sessions(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_sessions(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_render_failure(&self) {
        self.render_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_active_sessions(&self) -> u64 {
        self.active_sessions.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn get_snapshot(&self) -> MetricsSnapshot {
        // Cumulative counts, one per bound plus +Inf
        let mut running = 0;
        let latency_buckets = self
            .latency_buckets
            .iter()
            .enumerate()
            .map(|(i, count)| {
                running += count.load(Ordering::Relaxed);
                LatencyBucket {
                    le: LATENCY_BUCKETS_SECONDS.get(i).copied(),
                    count: running,
                }
            })
            .collect();

        MetricsSnapshot {
            log_requests_received: self.requests_received.load(Ordering::Relaxed),
            log_requests_completed: self.requests_completed.load(Ordering::Relaxed),
            log_requests_processing_time_seconds_sum: self.latency_sum_nanos.load(Ordering::Relaxed)
                as f64
                / 1e9,
            log_requests_processing_time_buckets: latency_buckets,
            active_sessions: self.get_active_sessions(),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            render_failures: self.render_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Cumulative histogram bucket; `le: None` is +Inf
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyBucket {
    pub le: Option<f64>,
    pub count: u64,
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub log_requests_received: u64,
    pub log_requests_completed: u64,
    pub log_requests_processing_time_seconds_sum: f64,
    pub log_requests_processing_time_buckets: Vec<LatencyBucket>,
    pub active_sessions: u64,
    pub deliveries: u64,
    pub render_failures: u64,
}
