//! Evaluation endpoints — full evaluation of one backend, and a two-backend
//! comparison on an identical sample set.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use nlu_core::eval::{self, ClassMetrics, EvaluationMetrics};
use nlu_core::normalize::normalize_output;
use nlu_core::prompt::PromptStyle;

use super::{ModelSelector, build_adapter};
use crate::adapters::{AdapterError, ModelAdapter};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub samples_per_intent: usize,
    #[serde(flatten)]
    pub model: ModelSelector,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub overall_accuracy: f64,
    pub classification_report: BTreeMap<String, ClassMetrics>,
}

#[derive(Debug, Deserialize)]
pub struct CompareModelsRequest {
    pub num_intents: Option<usize>,
    pub samples_per_intent: usize,
}

/// Overall metrics for one backend in a comparison.
#[derive(Debug, Serialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ModelMetrics {
    fn zeroed() -> Self {
        Self {
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        }
    }
}

impl From<&EvaluationMetrics> for ModelMetrics {
    fn from(metrics: &EvaluationMetrics) -> Self {
        Self {
            accuracy: metrics.accuracy,
            precision: metrics.precision,
            recall: metrics.recall,
            f1: metrics.f1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompareModelsResponse {
    pub local: ModelMetrics,
    pub remote: ModelMetrics,
}

/// POST /evaluate — sample every intent, predict sequentially, and score.
pub async fn evaluate(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> ApiResult<Json<EvaluateResponse>> {
    let style = PromptStyle::Classifier;
    let adapter = build_adapter(&state, &req.model, style)?;
    let samples = draw_samples(&state, req.samples_per_intent, None);

    tracing::info!(
        samples = samples.len(),
        model = %adapter.model_name(),
        "full evaluation started"
    );

    let y_pred = predict_all(adapter.as_ref(), &state, &samples).await?;
    let y_true: Vec<String> = samples.into_iter().map(|(_, intent)| intent).collect();

    let metrics = eval::evaluate(&y_true, &y_pred)?;
    Ok(Json(EvaluateResponse {
        overall_accuracy: metrics.accuracy,
        classification_report: metrics.per_class,
    }))
}

/// POST /compare_models — evaluate the local and remote backends on an
/// identical random sample set. Zeroed remote metrics when the remote
/// backend is unconfigured.
pub async fn compare_models(
    State(state): State<AppState>,
    Json(req): Json<CompareModelsRequest>,
) -> ApiResult<Json<CompareModelsResponse>> {
    let style = PromptStyle::Classifier;
    let defaults = ModelSelector::default();

    let local = build_adapter_for(&state, "local", &defaults, style)?;
    let samples = draw_samples(&state, req.samples_per_intent, req.num_intents);
    let y_true: Vec<String> = samples.iter().map(|(_, intent)| intent.clone()).collect();

    let local_preds = predict_all(local.as_ref(), &state, &samples).await?;
    let local_metrics = eval::evaluate(&y_true, &local_preds)?;

    let remote_metrics = match state.adapters.build("remote", style, &Default::default()) {
        Ok(remote) => {
            let remote_preds = predict_all(remote.as_ref(), &state, &samples).await?;
            ModelMetrics::from(&eval::evaluate(&y_true, &remote_preds)?)
        }
        Err(AdapterError::Unconfigured(backend)) => {
            tracing::warn!(backend = %backend, "backend unconfigured, reporting zeroed metrics");
            ModelMetrics::zeroed()
        }
        Err(e) => return Err(ApiError::Unavailable(e.to_string())),
    };

    Ok(Json(CompareModelsResponse {
        local: ModelMetrics::from(&local_metrics),
        remote: remote_metrics,
    }))
}

fn build_adapter_for(
    state: &AppState,
    model_type: &str,
    selector: &ModelSelector,
    style: PromptStyle,
) -> ApiResult<Box<dyn ModelAdapter>> {
    let mut selector = selector.clone();
    selector.model_type = Some(model_type.to_string());
    build_adapter(state, &selector, style)
}

/// Draw up to `samples_per_intent` examples per intent (uniform, without
/// replacement), optionally limited to the first `num_intents` intents.
fn draw_samples(
    state: &AppState,
    samples_per_intent: usize,
    num_intents: Option<usize>,
) -> Vec<(String, String)> {
    let count = num_intents.unwrap_or(state.schema.intents.len());
    state
        .schema
        .intents
        .iter()
        .take(count)
        .flat_map(|intent| {
            state
                .sample(&intent.examples, samples_per_intent)
                .into_iter()
                .map(|text| (text, intent.name.clone()))
        })
        .collect()
}

/// Sequential prediction over the sample set — one live model invocation at
/// a time. A transport failure fails the batch outright: partial, silently
/// degraded metrics would be misleading.
async fn predict_all(
    adapter: &dyn ModelAdapter,
    state: &AppState,
    samples: &[(String, String)],
) -> ApiResult<Vec<String>> {
    let mut predictions = Vec::with_capacity(samples.len());
    for (idx, (text, _)) in samples.iter().enumerate() {
        tracing::debug!(progress = idx + 1, total = samples.len(), "evaluating sample");
        let raw = adapter
            .predict(text, &state.schema)
            .await
            .map_err(|e| ApiError::Unavailable(e.to_string()))?;
        predictions.push(normalize_output(&raw, PromptStyle::Classifier).intent);
    }
    Ok(predictions)
}
