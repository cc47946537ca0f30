//! Remote hosted-model adapter (Gemini-style `generateContent` REST API).
//!
//! One synchronous request per prediction, carrying the built prompt and a
//! temperature setting; the raw completion is the first candidate's text.
//! The base URL is configurable so tests can point at a mock server.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use nlu_core::prompt::{PromptStyle, build_prompt};
use nlu_core::schema::Schema;

use super::{AdapterError, ModelAdapter};

/// Request body for `generateContent` (only the fields we send).
#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
}

/// Response body (only the fields we read).
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Adapter for a hosted model endpoint.
#[derive(Debug)]
pub struct RemoteApiAdapter {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f64,
    style: PromptStyle,
}

impl RemoteApiAdapter {
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        temperature: f64,
        timeout_secs: u64,
        style: PromptStyle,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            base_url,
            model,
            api_key,
            temperature,
            style,
        }
    }
}

#[async_trait]
impl ModelAdapter for RemoteApiAdapter {
    async fn predict(&self, text: &str, schema: &Schema) -> Result<String, AdapterError> {
        let prompt = build_prompt(text, schema, self.style);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, model = %self.model, "remote API returned non-success");
            return Err(AdapterError::Status(status.as_u16()));
        }

        let parsed: GenerateResponse = response.json().await?;
        let raw = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .find(|t| !t.trim().is_empty())
            .ok_or(AdapterError::EmptyCompletion)?;

        Ok(raw)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn schema() -> Schema {
        Schema::from_json_str(
            r#"{"intents": [{"name": "greet", "examples": ["hi"]}], "entities": {}}"#,
        )
        .unwrap()
    }

    fn adapter_for(server: &MockServer) -> RemoteApiAdapter {
        RemoteApiAdapter::new(
            server.uri(),
            "gemini-1.5-flash".into(),
            "test-key".into(),
            0.3,
            2,
            PromptStyle::Classifier,
        )
    }

    fn completion_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": text}]}
            }]
        })
    }

    #[tokio::test]
    async fn completion_text_returned_raw() {
        let server = MockServer::start().await;
        let body = completion_body(r#"{"intent": "greet", "confidence": 0.95, "entities": {}}"#);
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let raw = adapter_for(&server).predict("hello", &schema()).await.unwrap();
        assert!(raw.contains(r#""intent": "greet""#));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = adapter_for(&server)
            .predict("hello", &schema())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Status(429)));
    }

    #[tokio::test]
    async fn empty_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let err = adapter_for(&server)
            .predict("hello", &schema())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::EmptyCompletion));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        // Nothing listening on this port.
        let adapter = RemoteApiAdapter::new(
            "http://127.0.0.1:1".into(),
            "gemini-1.5-flash".into(),
            "test-key".into(),
            0.3,
            1,
            PromptStyle::Classifier,
        );
        let err = adapter.predict("hello", &schema()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Http(_)));
    }
}
