//! Single-query analysis endpoint.
//!
//! The one user-facing prediction path. Designed to never show a raw
//! crash: backend transport failures degrade into a polite fallback
//! `PredictionResult` with a populated `error` field, still HTTP 200.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use nlu_core::history::HistoryEntry;
use nlu_core::normalize::{PredictionResult, normalize_output};
use nlu_core::prompt::{PromptStyle, truncate_for_model};

use crate::adapters::{AdapterError, ModelOverrides};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub message: String,
    pub model_type: String,
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f64>,
}

/// POST /analyze — classify one message and generate an assistant reply.
pub async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> ApiResult<Json<PredictionResult>> {
    let style = PromptStyle::Assistant;
    let overrides = ModelOverrides {
        model_name: req.model_name.clone(),
        api_key: req.api_key.clone(),
        temperature: req.temperature,
    };

    let adapter = match state.adapters.build(&req.model_type, style, &overrides) {
        Ok(adapter) => adapter,
        // Naming a nonexistent backend or omitting required credentials is
        // a caller problem, not a model failure.
        Err(AdapterError::UnknownModelType(t)) => {
            return Err(ApiError::BadRequest(format!("unknown model type '{t}'")));
        }
        Err(AdapterError::Unconfigured(backend)) => {
            return Err(ApiError::BadRequest(format!(
                "backend '{backend}' is not configured (missing API key?)"
            )));
        }
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };

    let model_label = adapter.model_name().to_string();
    let truncated = truncate_for_model(&req.message);

    let result = match adapter.predict(&truncated, &state.schema).await {
        Ok(raw) => normalize_output(&raw, style),
        Err(e) => {
            tracing::warn!(model = %model_label, error = %e, "backend call failed, returning fallback");
            PredictionResult::backend_failure(e.to_string())
        }
    };

    tracing::info!(
        model = %model_label,
        intent = %result.intent,
        confidence = result.confidence,
        "analyze completed"
    );

    // Best-effort: a persistence failure must not fail the request.
    let entry =
        HistoryEntry::from_prediction(req.message, req.model_type, model_label, result.clone());
    if let Err(e) = state.history.append(&entry) {
        tracing::warn!(error = %e, "failed to append history entry");
    }

    Ok(Json(result))
}
