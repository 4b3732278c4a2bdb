use crate::broadcast::{BroadcastEngine, PayloadSink};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Shared application state for WebSocket handler
#[derive(Clone)]
pub struct WsAppState {
    pub engine: Arc<BroadcastEngine>,
}

/// GET /status_updates - WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(state): State<Arc<WsAppState>>,
) -> Response {
    let peer = connect_info.map(|ConnectInfo(addr)| addr.to_string());
    info!(peer = ?peer, "WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_socket(socket, state, peer))
}

/// Create WebSocket router
pub fn create_ws_router(state: Arc<WsAppState>) -> Router {
    Router::new()
        .route("/status_updates", get(ws_handler))
        .with_state(state)
}

async fn handle_socket(socket: WebSocket, state: Arc<WsAppState>, peer: Option<String>) {
    state.engine.run_session(WsSink { socket }, peer).await;
}

/// Subscriber transport over an upgraded WebSocket.
///
/// Payloads that are valid UTF-8 go out as text frames (what the status page
/// expects), anything else as binary.
pub struct WsSink {
    socket: WebSocket,
}

impl PayloadSink for WsSink {
    async fn send(&mut self, payload: Vec<u8>) -> anyhow::Result<()> {
        let msg = match String::from_utf8(payload) {
            Ok(text) => Message::Text(text),
            Err(e) => Message::Binary(e.into_bytes()),
        };
        self.socket.send(msg).await?;
        Ok(())
    }

    async fn closed(&mut self) {
        // Client frames carry nothing we act on; drain them until the peer leaves
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => continue,
            }
        }
    }
}
