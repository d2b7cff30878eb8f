//! HTTP surface for the textlift OCR service.
//!
//! Exposes the pipeline over a small REST API:
//!
//! - `POST /process_images` - batch recognition by URL list
//! - `POST /process_image` - single-reference recognition
//! - `POST /upload_image` - direct multipart upload recognition
//! - `GET /health` - liveness probe
//! - `GET /` - API information
//!
//! Any other route falls through to a JSON 404. The middleware stack adds
//! request IDs, structured request logging, a per-request timeout, and an
//! outermost panic boundary so every failure mode answers with the same
//! flat `{"error": ...}` body.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ServerError, ServerResult};
pub use state::ServerState;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use middleware::{handle_panic, log_requests, request_id};
use routes::{api_info, health, images, not_found, upload};

/// Build the Axum router with all routes and middleware
///
/// Middleware stack (outermost first):
/// 1. Panic boundary
/// 2. Trace spans
/// 3. Request ID tracking
/// 4. Request logging
/// 5. Timeout handling
///
/// Request ID tracking sits outside request logging so the logged events
/// carry the id it inserts.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/process_images", post(images::process_images))
        .route("/process_image", post(images::process_image))
        .route("/upload_image", post(upload::upload_image))
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .fallback(not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Start the textlift HTTP server
///
/// Initializes structured logging, builds the production pipeline and the
/// router, binds the configured TCP address, and serves until SIGTERM or
/// Ctrl+C. Blocks for the lifetime of the server.
pub async fn start_server(config: ServiceConfig) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .init();

    // Create server state
    let state = Arc::new(ServerState::new(config.clone()).map_err(|e| anyhow::anyhow!("{e}"))?);

    // Build router
    let app = build_router(state);

    // Parse bind address
    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!("Starting textlift server on {}", addr);
    tracing::info!(
        "Timeout: {}s, Max body: {}MB, Max batch: {}",
        config.timeout_secs,
        config.max_body_size_mb,
        config.max_batch_size
    );
    tracing::info!(
        "OCR engine: {} (language: {})",
        config.engine.command,
        config.engine.language
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
