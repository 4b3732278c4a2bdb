use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use telemetry_relay::api::create_app;
use telemetry_relay::broadcast::BroadcastEngine;
use telemetry_relay::config;
use telemetry_relay::state::{MetricsTracker, StateStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telemetry_relay=info".into()),
        )
        .init();

    info!("Telemetry relay starting...");

    let config = config::load_from_env().context("Failed to load configuration")?;

    let store = Arc::new(StateStore::new());
    let metrics = MetricsTracker::new();
    let stale_after = config
        .status
        .stale_after()
        .context("Invalid status configuration")?;
    let renderer = config.broadcast.format.renderer(stale_after);
    let mode = config.broadcast.delivery_mode();
    let engine = Arc::new(
        BroadcastEngine::new(Arc::clone(&store), renderer, mode).with_metrics(metrics.clone()),
    );
    info!(mode = ?mode, format = ?config.broadcast.format, "Broadcast engine initialized");

    let app = create_app(
        Arc::clone(&store),
        Arc::clone(&engine),
        metrics,
        &config.server.static_dir,
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "listening");

    let shutdown_engine = Arc::clone(&engine);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
        }
        info!("Shutdown signal received");
        // Sessions hold their connections open; end them so the server can drain
        shutdown_engine.shutdown();
    })
    .await
    .context("HTTP server error")?;

    info!("Telemetry relay stopped");
    Ok(())
}
