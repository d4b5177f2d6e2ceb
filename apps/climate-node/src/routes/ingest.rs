use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value as JsonValue};

use crate::error::{AppError, AppResult};
use crate::ingest::{ingest, IngestError};
use crate::state::AppState;

/// Decode the raw body here so a missing or malformed body answers with the
/// JSON error shape instead of the extractor's plain-text rejection.
async fn store_submission(state: &AppState, body: Bytes) -> AppResult<usize> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(IngestError::EmptyPayload.into());
    }
    let payload: JsonValue = serde_json::from_slice(&body)
        .map_err(|err| AppError::bad_request(format!("invalid JSON: {err}")))?;
    let records = state
        .store
        .blocking(move |store| Ok(ingest(store, &payload)))
        .await??;
    Ok(records.len())
}

pub(crate) async fn remote_data(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<JsonValue>> {
    store_submission(&state, body).await?;
    Ok(Json(json!({ "status": "success" })))
}

pub(crate) async fn submit_data(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<JsonValue>> {
    store_submission(&state, body).await?;
    Ok(Json(json!({ "message": "Data stored" })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/remote-data", post(remote_data))
        .route("/submit-data", post(submit_data))
}
