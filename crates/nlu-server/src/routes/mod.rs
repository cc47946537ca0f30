//! API route definitions and router builder.

pub mod analyze;
pub mod batch;
pub mod evaluate;
pub mod history;
pub mod meta;

use axum::Router;
use axum::routing::{get, post};
use serde::Deserialize;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use nlu_core::prompt::PromptStyle;

use crate::adapters::{AdapterError, ModelAdapter, ModelOverrides};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Backend selection fields shared by the batch/evaluation requests.
/// `model_type` falls back to the configured default when omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelSelector {
    pub model_type: Option<String>,
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f64>,
}

/// Build an adapter for a batch/evaluation request, mapping factory
/// failures onto HTTP errors: a bad backend name is the caller's bug, an
/// unconfigured backend is an upstream availability problem.
pub(crate) fn build_adapter(
    state: &AppState,
    selector: &ModelSelector,
    style: PromptStyle,
) -> ApiResult<Box<dyn ModelAdapter>> {
    let model_type = selector
        .model_type
        .clone()
        .unwrap_or_else(|| state.config.llm.default_model.clone());
    let overrides = ModelOverrides {
        model_name: selector.model_name.clone(),
        api_key: selector.api_key.clone(),
        temperature: selector.temperature,
    };

    state
        .adapters
        .build(&model_type, style, &overrides)
        .map_err(|e| match e {
            AdapterError::UnknownModelType(t) => {
                ApiError::BadRequest(format!("unknown model type '{t}'"))
            }
            AdapterError::Unconfigured(_) => ApiError::Unavailable(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        })
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(meta::health))
        .route("/intents", get(meta::get_intents))
        .route("/config", get(meta::get_config))
        .route(
            "/history",
            get(history::get_history).delete(history::clear_history),
        )
        .route("/analyze", post(analyze::analyze))
        .route("/evaluate", post(evaluate::evaluate))
        .route("/batch_test", post(batch::batch_test))
        .route("/compare_models", post(evaluate::compare_models))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
