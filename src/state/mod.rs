// Vehicle state store, aggregates and process metrics

mod aggregates;
mod entity;
mod metrics;
mod store;

pub use aggregates::{
    active_count, delta_distance, mean_speed, median_speed, Aggregates, ACTIVE_SPEED_THRESHOLD,
};
pub use entity::VehicleRecord;
pub use metrics::{LatencyBucket, MetricsSnapshot, MetricsTracker, LATENCY_BUCKETS_SECONDS};
pub use store::{Snapshot, StateStore};

#[cfg(test)]
mod tests;
