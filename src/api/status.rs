use crate::state::{MetricsSnapshot, MetricsTracker, StateStore};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::info;

/// Shared state for the status page and process endpoints
pub struct StatusAppState {
    pub store: Arc<StateStore>,
    pub metrics: MetricsTracker,
}

/// Page shell; the WebSocket stream fills in `#status`
const STATUS_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Vehicle status</title>
  <link rel="stylesheet" href="/static/style.css">
  <script src="https://unpkg.com/htmx.org@1.9.12"></script>
  <script src="https://unpkg.com/htmx.org@1.9.12/dist/ext/ws.js"></script>
</head>
<body>
  <main hx-ext="ws" ws-connect="/status_updates">
    <div id="status">Connecting...</div>
  </main>
</body>
</html>
"#;

#[derive(Serialize)]
struct MetricsResponse {
    vehicles: usize,
    #[serde(flatten)]
    metrics: MetricsSnapshot,
}

/// Create router for the status page, liveness, metrics and static files
pub fn create_status_router(state: Arc<StatusAppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/status", get(status_page))
        .route("/alive", get(alive))
        .route("/metrics", get(metrics))
        .with_state(state)
        .nest_service("/static", ServeDir::new(static_dir))
}

/// GET /status - HTML page subscribing to /status_updates
async fn status_page() -> Html<&'static str> {
    Html(STATUS_PAGE)
}

/// GET /alive - liveness probe
async fn alive() -> StatusCode {
    info!("ALIVE");
    StatusCode::OK
}

/// GET /metrics - ingestion and delivery counters
async fn metrics(State(state): State<Arc<StatusAppState>>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        vehicles: state.store.len(),
        metrics: state.metrics.get_snapshot(),
    })
}
