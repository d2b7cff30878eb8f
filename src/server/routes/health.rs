use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::json;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::server::state::ServerState;

/// Process start reference for uptime calculation
static SERVER_START_TIME: OnceLock<Instant> = OnceLock::new();

/// Health check endpoint (liveness)
/// Returns 200 if the server is running
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let uptime = SERVER_START_TIME.get_or_init(Instant::now).elapsed().as_secs();

    Json(json!({
        "status": "healthy",
        "service": "textlift",
        "version": env!("CARGO_PKG_VERSION"),
        "engine": state.engine_name(),
        "uptime_seconds": uptime,
    }))
}
