use axum::Json;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use serde_json::json;
use std::sync::Arc;

use crate::server::error::{ServerError, ServerResult};
use crate::server::state::ServerState;

/// Recognize text in a directly uploaded image.
///
/// Expects a multipart form with an `image` file part. Processing outcomes
/// are reported in-band: the endpoint answers 200 with either `{"text": ...}`
/// or `{"error": ...}`, reserving non-success statuses for requests that are
/// not valid multipart at all.
pub async fn upload_image(
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> ServerResult<impl IntoResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;

        let body = match state.pipeline.process_upload(&bytes, &filename) {
            Ok(text) => json!({ "text": text }),
            Err(err) => json!({ "error": err.to_string() }),
        };
        return Ok(Json(body));
    }

    Ok(Json(json!({ "error": "missing image file" })))
}
