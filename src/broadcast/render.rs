use crate::state::{Aggregates, Snapshot, VehicleRecord};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use std::sync::Arc;

/// Sent in place of a snapshot when rendering fails
pub const FALLBACK_PAYLOAD: &[u8] = b"<h2 id=\"status\">Internal Server Error</h2>";

#[derive(Debug)]
pub enum RenderError {
    Format(fmt::Error),
    Serialize(serde_json::Error),
    Other(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Format(e) => write!(f, "failed to format status: {}", e),
            RenderError::Serialize(e) => write!(f, "failed to serialize status: {}", e),
            RenderError::Other(msg) => write!(f, "render failed: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<fmt::Error> for RenderError {
    fn from(e: fmt::Error) -> Self {
        RenderError::Format(e)
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(e: serde_json::Error) -> Self {
        RenderError::Serialize(e)
    }
}

/// Turns a snapshot and its aggregates into a subscriber payload
pub trait Renderer: Send + Sync {
    fn render(&self, snapshot: &Snapshot, aggregates: &Aggregates) -> Result<Vec<u8>, RenderError>;
}

impl<F> Renderer for F
where
    F: Fn(&Snapshot, &Aggregates) -> Result<Vec<u8>, RenderError> + Send + Sync,
{
    fn render(&self, snapshot: &Snapshot, aggregates: &Aggregates) -> Result<Vec<u8>, RenderError> {
        self(snapshot, aggregates)
    }
}

/// Payload format selected in configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    #[default]
    Html,
    Json,
}

impl RenderFormat {
    pub fn renderer(self, stale_after: Duration) -> Arc<dyn Renderer> {
        match self {
            RenderFormat::Html => Arc::new(HtmlRenderer::new(stale_after)),
            RenderFormat::Json => Arc::new(JsonRenderer),
        }
    }
}

/// HTML fragment swapped into the status page (`#status`)
pub struct HtmlRenderer {
    stale_after: Duration,
}

impl HtmlRenderer {
    pub fn new(stale_after: Duration) -> Self {
        Self { stale_after }
    }

    fn write_row(
        &self,
        out: &mut String,
        vehicle: &VehicleRecord,
        now: DateTime<Utc>,
    ) -> fmt::Result {
        let class = if vehicle.is_stale(now, self.stale_after) {
            "vehicle stale"
        } else {
            "vehicle"
        };

        write!(out, "<tr class=\"{}\" data-id=\"{}\">", class, vehicle.id)?;
        write!(out, "<td>{}</td>", vehicle.id)?;
        for value in [
            vehicle.fuel,
            vehicle.gps_x,
            vehicle.gps_y,
            vehicle.gps_z,
            vehicle.pitch_lookahead_seconds,
            vehicle.target_dir,
            vehicle.target_dist,
            vehicle.vehicle_speed,
        ] {
            write!(out, "<td>{:.2}</td>", value)?;
        }
        write!(
            out,
            "<td>{}</td></tr>",
            vehicle.last_update.format("%H:%M:%S%.3f")
        )
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, snapshot: &Snapshot, aggregates: &Aggregates) -> Result<Vec<u8>, RenderError> {
        let mut out = String::with_capacity(4096);

        out.push_str("<div id=\"status\">");
        write!(
            out,
            "<table class=\"aggregates\"><tr>\
             <th>Median speed</th><td>{:.2}</td>\
             <th>Mean speed</th><td>{:.2}</td>\
             <th>Delta distance</th><td>{:.2}</td>\
             <th>Active</th><td>{}</td></tr></table>",
            aggregates.median_speed,
            aggregates.mean_speed,
            aggregates.delta_distance,
            aggregates.active_count,
        )?;

        out.push_str(
            "<table class=\"vehicles\"><thead><tr>\
             <th>ID</th><th>Fuel</th><th>GPS X</th><th>GPS Y</th><th>GPS Z</th>\
             <th>Pitch lookahead (s)</th><th>Target dir</th><th>Target dist</th>\
             <th>Speed</th><th>Last update</th></tr></thead><tbody>",
        );
        for vehicle in &snapshot.vehicles {
            self.write_row(&mut out, vehicle, snapshot.taken_at)?;
        }
        out.push_str("</tbody></table></div>");

        Ok(out.into_bytes())
    }
}

#[derive(Serialize)]
struct StatusPayload<'a> {
    generation: u64,
    taken_at: DateTime<Utc>,
    vehicles: &'a [VehicleRecord],
    aggregates: &'a Aggregates,
}

/// Machine-readable status for non-browser subscribers
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, snapshot: &Snapshot, aggregates: &Aggregates) -> Result<Vec<u8>, RenderError> {
        let payload = StatusPayload {
            generation: snapshot.generation,
            taken_at: snapshot.taken_at,
            vehicles: &snapshot.vehicles,
            aggregates,
        };
        Ok(serde_json::to_vec(&payload)?)
    }
}
