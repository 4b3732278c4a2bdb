use serde::{Deserialize, Serialize};
use std::fmt;

/// Telemetry channels a vehicle can report.
///
/// The set is closed: keys that do not map to a variant are ignored by the
/// parser rather than stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Fuel,
    GpsX,
    GpsY,
    GpsZ,
    #[serde(rename = "pitch_lookahead_secs")]
    PitchLookaheadSecs,
    TargetDir,
    TargetDist,
    VehicleSpeed,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Fuel,
        Field::GpsX,
        Field::GpsY,
        Field::GpsZ,
        Field::PitchLookaheadSecs,
        Field::TargetDir,
        Field::TargetDist,
        Field::VehicleSpeed,
    ];

    /// Wire key used on the ingestion query string
    pub fn key(self) -> &'static str {
        match self {
            Field::Fuel => "fuel",
            Field::GpsX => "gps_x",
            Field::GpsY => "gps_y",
            Field::GpsZ => "gps_z",
            Field::PitchLookaheadSecs => "pitch_lookahead_secs",
            Field::TargetDir => "target_dir",
            Field::TargetDist => "target_dist",
            Field::VehicleSpeed => "vehicle_speed",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single typed assignment produced by the parser
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FieldUpdate {
    pub field: Field,
    pub value: f64,
}

impl FieldUpdate {
    pub fn new(field: Field, value: f64) -> Self {
        Self { field, value }
    }
}
