use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::batch::BatchError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
///
/// Every variant renders as a flat `{"error": "<message>"}` JSON body so
/// callers parse one shape regardless of which tier rejected the request.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Endpoint not found")]
    NotFound,

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServerError {
    /// Get HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details go to the log, never to the caller.
        let message = match &self {
            ServerError::Internal(detail) | ServerError::Config(detail) => {
                tracing::error!(detail = %detail, "internal server error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

impl From<BatchError> for ServerError {
    fn from(err: BatchError) -> Self {
        ServerError::BadRequest(err.to_string())
    }
}
