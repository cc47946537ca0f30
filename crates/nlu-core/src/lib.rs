//! Core library for the LLM-based NLU engine.
//!
//! Everything that does not need a running server lives here: the intent
//! schema, prompt construction, normalization of raw model output into a
//! typed prediction, classification metrics, and the interaction history log.

pub mod eval;
pub mod history;
pub mod normalize;
pub mod prompt;
pub mod schema;

pub use eval::{ClassMetrics, EvalError, EvaluationMetrics, evaluate};
pub use history::{HistoryEntry, HistoryLog};
pub use normalize::{PredictionResult, normalize_output};
pub use prompt::{PromptStyle, build_prompt, truncate_for_model};
pub use schema::{Intent, Schema, SchemaError};
