// HTTP and WebSocket APIs

mod ingestion;
pub mod query;
pub mod status;
pub mod websocket;

pub use ingestion::{create_ingest_router, IngestAppState, IngestResponse};
pub use query::{create_query_router, QueryAppState, StatusResponse};
pub use status::{create_status_router, StatusAppState};
pub use websocket::{create_ws_router, ws_handler, WsAppState, WsSink};

use crate::broadcast::BroadcastEngine;
use crate::state::{MetricsTracker, StateStore};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Assemble every route into one application router
pub fn create_app(
    store: Arc<StateStore>,
    engine: Arc<BroadcastEngine>,
    metrics: MetricsTracker,
    static_dir: &Path,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(create_ingest_router(IngestAppState {
            store: Arc::clone(&store),
            metrics: metrics.clone(),
        }))
        .merge(create_ws_router(Arc::new(WsAppState {
            engine: Arc::clone(&engine),
        })))
        .merge(create_query_router(Arc::new(QueryAppState { engine })))
        .merge(create_status_router(
            Arc::new(StatusAppState { store, metrics }),
            static_dir,
        ))
        .layer(cors)
}
