//! Batch testing endpoint — predictions over samples of one intent.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use nlu_core::normalize::normalize_output;
use nlu_core::prompt::PromptStyle;

use super::{ModelSelector, build_adapter};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BatchTestRequest {
    pub intent: String,
    pub num_samples: usize,
    #[serde(flatten)]
    pub model: ModelSelector,
}

#[derive(Debug, Serialize)]
pub struct BatchTestResult {
    pub text: String,
    pub predicted_intent: String,
    pub confidence: f64,
    pub entities: BTreeMap<String, String>,
}

/// POST /batch_test — run predictions on a random sample of one intent's
/// examples. Samples run strictly sequentially: one live model invocation
/// at a time, and a backend failure surfaces as a request failure rather
/// than silently degrading the batch.
pub async fn batch_test(
    State(state): State<AppState>,
    Json(req): Json<BatchTestRequest>,
) -> ApiResult<Json<Vec<BatchTestResult>>> {
    let intent = state
        .schema
        .find_intent(&req.intent)
        .ok_or_else(|| ApiError::NotFound(format!("intent '{}' not found", req.intent)))?;

    let style = PromptStyle::Classifier;
    let adapter = build_adapter(&state, &req.model, style)?;
    let samples = state.sample(&intent.examples, req.num_samples);

    tracing::info!(
        intent = %req.intent,
        samples = samples.len(),
        model = %adapter.model_name(),
        "batch test started"
    );

    let mut results = Vec::with_capacity(samples.len());
    for text in samples {
        let raw = adapter
            .predict(&text, &state.schema)
            .await
            .map_err(|e| ApiError::Unavailable(e.to_string()))?;
        let prediction = normalize_output(&raw, style);
        results.push(BatchTestResult {
            text,
            predicted_intent: prediction.intent,
            confidence: prediction.confidence,
            entities: prediction.entities,
        });
    }

    Ok(Json(results))
}
