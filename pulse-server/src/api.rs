//! HTTP surface: websocket stream, health check and static UI.
//!
//! Endpoints:
//!
//! - `GET /ws`    : upgrade to a websocket and start a broadcast session
//! - `GET /health`: liveness check with session count (JSON)
//! - anything else: static files from the UI directory

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use pulse::Monitor;
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::transport::WsTransport;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    monitor: Arc<Monitor>,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct Health {
    /// Always `"ok"` while the process serves requests.
    pub status: &'static str,
    /// Sessions currently broadcasting.
    pub sessions: usize,
    /// Samples per frame.
    pub capacity: usize,
    /// Samples pushed since startup.
    pub pushes: u64,
}

/// Builds the application router around a running monitor.
pub fn build_router(monitor: Arc<Monitor>, ui_dir: &Path) -> Router {
    Router::new()
        .route("/ws", get(stream))
        .route("/health", get(health))
        .fallback_service(ServeDir::new(ui_dir))
        .with_state(AppState { monitor })
}

/// `GET /ws`: attaches the upgraded socket to the monitor.
async fn stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_failed_upgrade(|e| tracing::warn!("websocket upgrade failed: {e}"))
        .on_upgrade(move |socket| async move {
            let id = state.monitor.attach(WsTransport::new(socket));
            tracing::debug!(session = %id, "websocket attached");
        })
}

/// `GET /health`: liveness and load.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let buffer = state.monitor.buffer();
    Json(Health {
        status: "ok",
        sessions: state.monitor.active_sessions(),
        capacity: buffer.capacity(),
        pushes: buffer.pushes(),
    })
}
