//! Server configuration, loadable from TOML or environment.

use serde::{Deserialize, Serialize};

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0").
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path to the intent schema JSON file.
    #[serde(default = "default_schema_path")]
    pub schema_path: String,
    /// Path to the interaction history log.
    #[serde(default = "default_history_path")]
    pub history_path: String,
    /// Model selection defaults.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Local process backend settings.
    #[serde(default)]
    pub local: LocalModelConfig,
    /// Remote API backend settings.
    #[serde(default)]
    pub remote: RemoteModelConfig,
}

/// Which backends exist and which one is the default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model_type")]
    pub default_model: String,
    #[serde(default = "default_available_models")]
    pub available_models: Vec<String>,
}

/// Locally-invoked inference process (one spawn per prediction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalModelConfig {
    /// Binary to spawn; the prompt is fed via stdin.
    #[serde(default = "default_local_command")]
    pub command: String,
    /// Model name passed as `run <model>`.
    #[serde(default = "default_local_model")]
    pub model: String,
    /// Per-call timeout in seconds.
    #[serde(default = "default_local_timeout")]
    pub timeout_secs: u64,
}

/// Hosted model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteModelConfig {
    /// API base URL (overridable so tests can point at a mock server).
    #[serde(default = "default_remote_base_url")]
    pub base_url: String,
    #[serde(default = "default_remote_model")]
    pub model: String,
    /// API key. Never serialized back out (e.g., via GET /config).
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_schema_path() -> String {
    "data/intents.json".to_string()
}
fn default_history_path() -> String {
    "logs/history.jsonl".to_string()
}
fn default_model_type() -> String {
    "local".to_string()
}
fn default_available_models() -> Vec<String> {
    vec!["local".to_string(), "remote".to_string()]
}
fn default_local_command() -> String {
    "ollama".to_string()
}
fn default_local_model() -> String {
    "gemma".to_string()
}
fn default_local_timeout() -> u64 {
    60
}
fn default_remote_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_remote_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_temperature() -> f64 {
    0.3
}
fn default_remote_timeout() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_model: default_model_type(),
            available_models: default_available_models(),
        }
    }
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            command: default_local_command(),
            model: default_local_model(),
            timeout_secs: default_local_timeout(),
        }
    }
}

impl Default for RemoteModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_remote_base_url(),
            model: default_remote_model(),
            api_key: None,
            temperature: default_temperature(),
            timeout_secs: default_remote_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            schema_path: default_schema_path(),
            history_path: default_history_path(),
            llm: LlmConfig::default(),
            local: LocalModelConfig::default(),
            remote: RemoteModelConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from the path in `NLU_CONFIG` (default `config/server.toml`),
    /// falling back to defaults when the file is missing. An API key in
    /// `NLU_REMOTE_API_KEY` overrides the file value.
    pub fn load() -> Self {
        let path = std::env::var("NLU_CONFIG").unwrap_or_else(|_| "config/server.toml".into());
        let mut config = match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "config file unavailable, using defaults");
                Self::default()
            }
        };
        if let Ok(key) = std::env::var("NLU_REMOTE_API_KEY") {
            if !key.is_empty() {
                config.remote.api_key = Some(key);
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.llm.default_model, "local");
        assert_eq!(config.local.command, "ollama");
        assert!(config.remote.api_key.is_none());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
port = 9000

[local]
model = "gemma:2b"

[remote]
model = "gemini-1.5-pro"
api_key = "secret"
temperature = 0.7
"#;
        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0"); // default
        assert_eq!(config.local.model, "gemma:2b");
        assert_eq!(config.local.timeout_secs, 60); // default
        assert_eq!(config.remote.api_key.as_deref(), Some("secret"));
        assert!((config.remote.temperature - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn api_key_never_serialized() {
        let mut config = ServerConfig::default();
        config.remote.api_key = Some("secret".to_string());
        let json = serde_json::to_value(&config).unwrap();
        assert!(json["remote"].get("api_key").is_none());
        assert!(!json.to_string().contains("secret"));
    }
}
