//! Model backends behind a single `predict` capability.
//!
//! Adapters own transport and nothing else: they carry the built prompt to
//! a backend and hand back the raw completion text untouched. All
//! interpretation happens in `nlu_core::normalize`, so every backend shares
//! one normalization code path. Transport failures surface as
//! `AdapterError`, never as a panic or an unhandled propagation.

pub mod local;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;

use nlu_core::prompt::PromptStyle;
use nlu_core::schema::Schema;

use crate::config::ServerConfig;

pub use local::LocalProcessAdapter;
pub use remote::RemoteApiAdapter;

/// Transport-level failure of a model backend.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error talking to model process: {0}")]
    Io(#[from] std::io::Error),

    #[error("model call timed out after {0}s")]
    Timeout(u64),

    #[error("model process exited with {code:?}: {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote API returned status {0}")]
    Status(u16),

    #[error("model returned an empty completion")]
    EmptyCompletion,

    #[error("backend '{0}' is not configured")]
    Unconfigured(String),

    #[error("unknown model type '{0}'")]
    UnknownModelType(String),
}

/// A model backend. `predict` returns the raw completion text; it never
/// interprets the output. Stateless across calls apart from
/// construction-time configuration.
#[async_trait]
pub trait ModelAdapter: Send + Sync + std::fmt::Debug {
    async fn predict(&self, text: &str, schema: &Schema) -> Result<String, AdapterError>;

    /// Concrete model name (for logging and history records).
    fn model_name(&self) -> &str;
}

/// Which backend family a request names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Local,
    Remote,
}

impl ModelKind {
    /// Parse a request's `model_type`. Legacy values from older clients
    /// map onto the backend family they used to name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local" | "ollama" | "gemma" => Some(Self::Local),
            "remote" | "api" | "gemini" | "qwen" => Some(Self::Remote),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Per-request overrides for the configured backend defaults.
#[derive(Debug, Clone, Default)]
pub struct ModelOverrides {
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f64>,
}

/// Builds adapters from a backend name plus request overrides. A trait so
/// tests can inject canned backends instead of real transports.
pub trait AdapterFactory: Send + Sync {
    fn build(
        &self,
        model_type: &str,
        style: PromptStyle,
        overrides: &ModelOverrides,
    ) -> Result<Box<dyn ModelAdapter>, AdapterError>;
}

/// Production factory wired to the loaded configuration.
pub struct ConfigAdapterFactory {
    config: Arc<ServerConfig>,
}

impl ConfigAdapterFactory {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self { config }
    }
}

impl AdapterFactory for ConfigAdapterFactory {
    fn build(
        &self,
        model_type: &str,
        style: PromptStyle,
        overrides: &ModelOverrides,
    ) -> Result<Box<dyn ModelAdapter>, AdapterError> {
        let kind = ModelKind::parse(model_type)
            .ok_or_else(|| AdapterError::UnknownModelType(model_type.to_string()))?;

        match kind {
            ModelKind::Local => {
                let local = &self.config.local;
                let model = overrides
                    .model_name
                    .clone()
                    .unwrap_or_else(|| local.model.clone());
                Ok(Box::new(LocalProcessAdapter::new(
                    local.command.clone(),
                    model,
                    local.timeout_secs,
                    style,
                )))
            }
            ModelKind::Remote => {
                let remote = &self.config.remote;
                let api_key = overrides
                    .api_key
                    .clone()
                    .or_else(|| remote.api_key.clone())
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| AdapterError::Unconfigured("remote".to_string()))?;
                let model = overrides
                    .model_name
                    .clone()
                    .unwrap_or_else(|| remote.model.clone());
                let temperature = overrides.temperature.unwrap_or(remote.temperature);
                Ok(Box::new(RemoteApiAdapter::new(
                    remote.base_url.clone(),
                    model,
                    api_key,
                    temperature,
                    remote.timeout_secs,
                    style,
                )))
            }
        }
    }
}
