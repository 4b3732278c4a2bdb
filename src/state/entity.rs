use crate::telemetry::{Field, FieldUpdate};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Merged telemetry for one vehicle.
///
/// Every channel keeps the most recent value seen for it; a partial update
/// leaves the channels it does not mention untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    /// Vehicle id (0 = unknown source)
    pub id: u64,
    pub fuel: f64,
    pub gps_x: f64,
    pub gps_y: f64,
    pub gps_z: f64,
    pub pitch_lookahead_seconds: f64,
    pub target_dir: f64,
    pub target_dist: f64,
    pub vehicle_speed: f64,

    /// Time of the last merge touching this vehicle
    pub last_update: DateTime<Utc>,
}

impl VehicleRecord {
    pub fn new(id: u64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            fuel: 0.0,
            gps_x: 0.0,
            gps_y: 0.0,
            gps_z: 0.0,
            pitch_lookahead_seconds: 0.0,
            target_dir: 0.0,
            target_dist: 0.0,
            vehicle_speed: 0.0,
            last_update: now,
        }
    }

    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Fuel => self.fuel,
            Field::GpsX => self.gps_x,
            Field::GpsY => self.gps_y,
            Field::GpsZ => self.gps_z,
            Field::PitchLookaheadSecs => self.pitch_lookahead_seconds,
            Field::TargetDir => self.target_dir,
            Field::TargetDist => self.target_dist,
            Field::VehicleSpeed => self.vehicle_speed,
        }
    }

    pub fn set(&mut self, field: Field, value: f64) {
        let slot = match field {
            Field::Fuel => &mut self.fuel,
            Field::GpsX => &mut self.gps_x,
            Field::GpsY => &mut self.gps_y,
            Field::GpsZ => &mut self.gps_z,
            Field::PitchLookaheadSecs => &mut self.pitch_lookahead_seconds,
            Field::TargetDir => &mut self.target_dir,
            Field::TargetDist => &mut self.target_dist,
            Field::VehicleSpeed => &mut self.vehicle_speed,
        };
        *slot = value;
    }

    /// Apply updates in order and stamp the record
    pub fn apply(&mut self, updates: &[FieldUpdate], now: DateTime<Utc>) {
        for update in updates {
            self.set(update.field, update.value);
        }
        self.last_update = now;
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.last_update > max_age
    }
}
