//! Health, schema, and configuration endpoints.

use axum::Json;
use axum::extract::State;

use nlu_core::schema::Schema;

use crate::config::ServerConfig;
use crate::state::AppState;

/// GET /health — liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /intents — the schema as loaded at startup.
pub async fn get_intents(State(state): State<AppState>) -> Json<Schema> {
    Json((*state.schema).clone())
}

/// GET /config — model defaults and paths. The remote API key is never
/// serialized, so it cannot leak through this endpoint.
pub async fn get_config(State(state): State<AppState>) -> Json<ServerConfig> {
    Json((*state.config).clone())
}
