//! Interaction history endpoints.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use nlu_core::history::HistoryEntry;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Default number of entries returned by GET /history.
const DEFAULT_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// GET /history?limit=N — newest-first interaction records.
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let entries = state
        .history
        .read(limit)
        .map_err(|e| ApiError::Internal(format!("failed to read history: {e}")))?;
    Ok(Json(entries))
}

/// DELETE /history — clear the entire log.
pub async fn clear_history(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    state
        .history
        .clear()
        .map_err(|e| ApiError::Internal(format!("failed to clear history: {e}")))?;
    tracing::info!("interaction history cleared");
    Ok(Json(serde_json::json!({ "status": "cleared" })))
}
