use crate::broadcast::{BroadcastEngine, SessionInfo};
use crate::state::{Aggregates, VehicleRecord};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Shared state for the read API
pub struct QueryAppState {
    pub engine: Arc<BroadcastEngine>,
}

/// Current state of every vehicle plus fleet aggregates
#[derive(Serialize)]
pub struct StatusResponse {
    pub generation: u64,
    #[serde(rename = "takenAt")]
    pub taken_at: DateTime<Utc>,
    pub vehicles: Vec<VehicleRecord>,
    pub aggregates: Aggregates,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create query API router
pub fn create_query_router(state: Arc<QueryAppState>) -> Router {
    Router::new()
        .route("/api/state/vehicles", get(list_vehicles))
        .route("/api/state/vehicles/:id", get(get_vehicle))
        .route("/api/sessions", get(list_sessions))
        .with_state(state)
}

/// GET /api/state/vehicles - snapshot ordered by id, with aggregates
async fn list_vehicles(State(state): State<Arc<QueryAppState>>) -> Json<StatusResponse> {
    let snapshot = state.engine.store().snapshot();
    let aggregates = Aggregates::compute(&snapshot.vehicles);

    Json(StatusResponse {
        generation: snapshot.generation,
        taken_at: snapshot.taken_at,
        vehicles: snapshot.vehicles,
        aggregates,
    })
}

/// GET /api/state/vehicles/:id - single vehicle
async fn get_vehicle(
    State(state): State<Arc<QueryAppState>>,
    Path(id): Path<u64>,
) -> Result<Json<VehicleRecord>, QueryError> {
    state
        .engine
        .store()
        .get(id)
        .map(Json)
        .ok_or(QueryError::NotFound(id))
}

/// GET /api/sessions - live subscriber sessions, oldest first
async fn list_sessions(State(state): State<Arc<QueryAppState>>) -> Json<Vec<SessionInfo>> {
    Json(state.engine.sessions())
}

/// Query error types
#[derive(Debug)]
enum QueryError {
    NotFound(u64),
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            QueryError::NotFound(id) => (StatusCode::NOT_FOUND, format!("vehicle {} not found", id)),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
