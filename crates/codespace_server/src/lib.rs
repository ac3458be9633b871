//! Codespace Sync Server
//!
//! Realtime backend for shared code editing spaces.
//!
//! ## Features
//!
//! - **Spaces**: named sets of files, created on first visit with a default file
//! - **Access gate**: private spaces are readable only with their passcode
//! - **Rooms**: WebSocket events are relayed to the members of one space
//! - **Persistent storage**: SQLite-based storage for spaces and files
//! - **Terminal**: allow-listed commands whose output streams back to the requester
//!
//! ## Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 5000)
//! - `DATABASE_PATH`: Path to SQLite database (default: ./codespace.db)
//! - `CORS_ORIGINS`: Comma-separated list of allowed origins (default: `*`)
//! - `TERMINAL_ALLOWED_COMMANDS`: Programs the terminal may launch (default: node,python)
//! - `TERMINAL_TIMEOUT_SECS`: Per-command time limit (default: 30)

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod sync;
pub mod terminal;

pub use config::Config;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use handlers::{ApiState, WsState, api_routes, ws_handler};
use sync::SyncEngine;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Build the HTTP and WebSocket router around a sync engine
pub fn app(engine: SyncEngine, config: &Config) -> Router {
    let api_state = ApiState {
        engine: engine.clone(),
    };
    let ws_state = WsState { engine };

    Router::new()
        // Health check
        .route("/", get(|| async { "Codespace Sync Server" }))
        .route("/health", get(|| async { "OK" }))
        // WebSocket endpoint
        .route("/ws", get(ws_handler).with_state(ws_state))
        // API routes
        .nest("/api", api_routes(api_state))
        // Add layers
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE]);

    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}
