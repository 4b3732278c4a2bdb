// Telemetry field parsing
pub mod telemetry;

// Vehicle state store, aggregates and metrics
pub mod state;

// Subscriber sessions and rendering
pub mod broadcast;

// HTTP and WebSocket APIs
pub mod api;

// Configuration
pub mod config;
