use crate::state::entity::VehicleRecord;
use serde::Serialize;

/// Vehicles at or above this speed count as active
pub const ACTIVE_SPEED_THRESHOLD: f64 = 80.0;

/// Summary statistics over one snapshot. Never stored; recomputed per delivery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Aggregates {
    pub median_speed: f64,
    pub mean_speed: f64,
    pub delta_distance: f64,
    pub active_count: usize,
}

impl Aggregates {
    pub fn compute(vehicles: &[VehicleRecord]) -> Self {
        Self {
            median_speed: median_speed(vehicles),
            mean_speed: mean_speed(vehicles),
            delta_distance: delta_distance(vehicles),
            active_count: active_count(vehicles),
        }
    }
}

/// Speed at index `n / 2` of the sorted speeds.
///
/// For an even count this is the upper-middle value, not the average of the
/// two middle values.
pub fn median_speed(vehicles: &[VehicleRecord]) -> f64 {
    if vehicles.is_empty() {
        return 0.0;
    }

    let mut speeds: Vec<f64> = vehicles.iter().map(|v| v.vehicle_speed).collect();
    speeds.sort_by(f64::total_cmp);
    speeds[speeds.len() / 2]
}

pub fn mean_speed(vehicles: &[VehicleRecord]) -> f64 {
    if vehicles.is_empty() {
        return 0.0;
    }

    let total: f64 = vehicles.iter().map(|v| v.vehicle_speed).sum();
    total / vehicles.len() as f64
}

/// Largest minus smallest target distance.
///
/// Both bounds start at 0.0, so with all-positive distances the result is the
/// maximum itself and with all-negative distances it is `0.0 - min`.
pub fn delta_distance(vehicles: &[VehicleRecord]) -> f64 {
    let mut max = 0.0_f64;
    let mut min = 0.0_f64;

    for dist in vehicles.iter().map(|v| v.target_dist) {
        if dist > max {
            max = dist;
        }
        if dist < min {
            min = dist;
        }
    }

    max - min
}

pub fn active_count(vehicles: &[VehicleRecord]) -> usize {
    vehicles
        .iter()
        .filter(|v| v.vehicle_speed >= ACTIVE_SPEED_THRESHOLD)
        .count()
}
