//! Output normalization — turns unreliable raw model text into a typed
//! `PredictionResult`.
//!
//! Backends wrap JSON in markdown fences, prepend commentary, answer in
//! prose, or return nothing at all. `normalize_output` is total: every
//! input, including the empty string, yields a well-formed result. The key
//! policy is the fallback distinction between "plausible prose" (the model
//! answered informally) and "nothing usable" (the model failed).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::prompt::PromptStyle;

/// Intent sentinel for unparseable or unclassifiable input.
pub const UNKNOWN_INTENT: &str = "unknown";

/// Intent sentinel for informal prose answers from assistant-style prompts.
pub const GENERAL_CONVERSATION: &str = "general_conversation";

/// Raw text shorter than this (trimmed) is not treated as a prose answer.
const MIN_PROSE_LEN: usize = 5;

const DEFAULT_CONFIDENCE: f64 = 0.5;

const PLACEHOLDER_RESPONSE: &str =
    "I'm sorry, I couldn't generate a specific response. How can I help you?";

const CLARIFY_RESPONSE: &str =
    "I'm here to help! Could you please clarify your request or provide more details?";

/// Typed result of a single prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// A schema intent name, `"unknown"`, or `"general_conversation"`.
    pub intent: String,
    /// Always present, always in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Extracted entity values. Always strings, never null.
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
    /// Natural-language reply (assistant-style prompts only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Populated when a backend transport failure was absorbed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResult {
    /// Zero-confidence fallback for when nothing usable came back.
    pub fn fallback(style: PromptStyle) -> Self {
        Self {
            intent: UNKNOWN_INTENT.to_string(),
            confidence: 0.0,
            entities: BTreeMap::new(),
            response: match style {
                PromptStyle::Assistant => Some(CLARIFY_RESPONSE.to_string()),
                PromptStyle::Classifier => None,
            },
            error: None,
        }
    }

    /// Fallback carrying a backend failure description, with an apologetic
    /// reply so the chat path never shows a raw crash.
    pub fn backend_failure(message: impl Into<String>) -> Self {
        Self {
            intent: UNKNOWN_INTENT.to_string(),
            confidence: 0.0,
            entities: BTreeMap::new(),
            response: Some(
                "I'm sorry, I ran into a problem reaching the model. Please try again."
                    .to_string(),
            ),
            error: Some(message.into()),
        }
    }
}

/// Normalize raw model output. Total: never fails, never panics.
pub fn normalize_output(raw: &str, style: PromptStyle) -> PredictionResult {
    let parsed = extract_json_object(raw)
        .and_then(|candidate| serde_json::from_str::<serde_json::Value>(candidate).ok())
        .and_then(|value| match value {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        });

    match parsed {
        Some(object) => normalize_fields(object, style),
        None => prose_fallback(raw, style),
    }
}

/// Field normalization for a decoded JSON object.
fn normalize_fields(
    object: serde_json::Map<String, serde_json::Value>,
    style: PromptStyle,
) -> PredictionResult {
    let intent = object
        .get("intent")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(UNKNOWN_INTENT)
        .to_string();

    let confidence = object
        .get("confidence")
        .and_then(coerce_confidence)
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);

    let entities = object
        .get("entities")
        .and_then(|v| v.as_object())
        .map(coerce_entities)
        .unwrap_or_default();

    let response = match style {
        PromptStyle::Assistant => {
            let text = object
                .get("response")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(PLACEHOLDER_RESPONSE);
            Some(text.to_string())
        }
        PromptStyle::Classifier => None,
    };

    PredictionResult {
        intent,
        confidence,
        entities,
        response,
        error: None,
    }
}

/// Fallback when no JSON object could be decoded: non-trivial free text
/// under an assistant-style contract is treated as an informal answer, not
/// a failure.
fn prose_fallback(raw: &str, style: PromptStyle) -> PredictionResult {
    let trimmed = raw.trim();
    if style == PromptStyle::Assistant && trimmed.len() > MIN_PROSE_LEN {
        return PredictionResult {
            intent: GENERAL_CONVERSATION.to_string(),
            confidence: DEFAULT_CONFIDENCE,
            entities: BTreeMap::new(),
            response: Some(trimmed.to_string()),
            error: None,
        };
    }
    PredictionResult::fallback(style)
}

/// Cast a JSON value to a confidence float. Accepts numbers and numeric
/// strings; anything else is "non-numeric" and takes the default.
fn coerce_confidence(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Keep string entity values, stringify scalars, drop nulls and nested
/// structures. Schema conformance is a prompt-level instruction, not
/// enforced here.
fn coerce_entities(map: &serde_json::Map<String, serde_json::Value>) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(key, value)| {
            let coerced = match value {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            };
            coerced.map(|v| (key.clone(), v))
        })
        .collect()
}

/// Find the first balanced `{...}` substring, tracking JSON string literals
/// and escapes so braces inside strings don't confuse the depth count.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
