//! API route handlers
//!
//! Routes are organized by functionality:
//!
//! - `health`: Liveness probe
//! - `images`: Reference-based recognition (single and batch)
//! - `upload`: Direct image upload recognition

pub mod health;
pub mod images;
pub mod upload;

use axum::Json;
use axum::response::IntoResponse;
use serde_json::json;

use crate::server::error::{ServerError, ServerResult};

/// API version and base info
///
/// Root endpoint (GET /) listing the available endpoints.
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "textlift",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/process_images",
            "/process_image",
            "/upload_image",
            "/health"
        ]
    })))
}

/// Catch-all handler for undefined routes
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
