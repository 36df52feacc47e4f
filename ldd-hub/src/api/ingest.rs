//! Write endpoints: reading ingestion and reset

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::auth::presented_token;
use crate::error::HubResult;
use crate::AppState;

/// POST /update
///
/// Body: `{"node": "...", "status": "...", "rock_stats": {"<30mm": 7, ...}}`.
/// The body is taken raw so a bad credential is reported before a bad payload.
pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> HubResult<impl IntoResponse> {
    let receipt = state
        .hub
        .ingest_json(presented_token(&headers), &body)
        .await?;
    Ok(Json(receipt))
}

/// POST /api/reset
///
/// Requires the admin key.
pub async fn reset(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> HubResult<impl IntoResponse> {
    state.hub.reset(presented_token(&headers)).await?;
    Ok(Json(json!({ "message": "Reset complete." })))
}
