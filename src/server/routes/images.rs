use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::batch::{BatchRequest, run_batch};
use crate::server::error::{ServerError, ServerResult};
use crate::server::state::ServerState;
use crate::{ItemResult, derive_id};

/// Process a batch of image references.
///
/// The body must carry an `image_urls` list of strings, at most
/// `max_batch_size` entries. Validation failures reject the whole batch with
/// a 400 before any image work starts; after admission every reference is
/// processed independently and the response is always a 200 with one result
/// per input, in input order.
pub async fn process_images(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<Value>,
) -> ServerResult<impl IntoResponse> {
    let request = BatchRequest::from_value(&body, state.config.max_batch_size)?;
    let results = run_batch(&state.pipeline, &request).await;
    Ok(Json(results))
}

/// Process a single image reference.
///
/// Accepts `{"image_link": "...", "unique_id": "..."}`; `unique_id` is
/// optional and falls back to the id derived from the link. Unlike the batch
/// endpoint, a pipeline failure here maps to a 400 with the flat error body.
pub async fn process_image(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<Value>,
) -> ServerResult<impl IntoResponse> {
    let reference = body
        .get("image_link")
        .and_then(Value::as_str)
        .ok_or_else(|| ServerError::BadRequest("missing 'image_link' field".to_string()))?;

    let id = match body.get("unique_id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => derive_id(reference),
    };

    match state.pipeline.process_reference_with_id(reference, id).await {
        ItemResult::Success { id, text } => Ok(Json(json!({ "id": id, "text": text }))),
        ItemResult::Failure { error, .. } => Err(ServerError::BadRequest(error)),
    }
}
