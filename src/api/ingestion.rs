use crate::state::{MetricsTracker, StateStore};
use crate::telemetry::{parse_update, IngestDiagnostic};
use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Shared state for the ingestion endpoint
#[derive(Clone)]
pub struct IngestAppState {
    pub store: Arc<StateStore>,
    pub metrics: MetricsTracker,
}

/// Summary of one ingested update
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub id: u64,
    pub applied: usize,
    pub ignored: Vec<IngestDiagnostic>,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create ingestion router
pub fn create_ingest_router(state: IngestAppState) -> Router {
    Router::new()
        .route("/log", get(log_update))
        .with_state(Arc::new(state))
}

/// GET /log?id=<u64>&<field>=<f64>... - merge one partial update
///
/// Bad ids, bad values and unknown keys are reported in the response body
/// but never fail the request; only an undecodable query string does.
async fn log_update(
    State(state): State<Arc<IngestAppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<IngestResponse>, IngestError> {
    state.metrics.record_request();
    let start = Instant::now();

    let query = query.unwrap_or_default();
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(&query).map_err(|e| {
        error!(query = %query, error = %e, "failed to parse request query");
        IngestError::MalformedQuery(e.to_string())
    })?;

    let parsed = parse_update(pairs);
    state.store.merge(parsed.id, &parsed.updates);
    debug!(id = parsed.id, applied = parsed.updates.len(), "ingested update");

    state.metrics.record_completed(start.elapsed());

    Ok(Json(IngestResponse {
        id: parsed.id,
        applied: parsed.updates.len(),
        ignored: parsed.diagnostics,
    }))
}

/// Ingestion error types
#[derive(Debug)]
enum IngestError {
    MalformedQuery(String),
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            IngestError::MalformedQuery(msg) => {
                (StatusCode::BAD_REQUEST, format!("malformed query: {}", msg))
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
