//! Intent schema — the fixed set of intents and entity slots the engine
//! classifies against.
//!
//! Loaded once at process start and shared read-only for the process
//! lifetime. Validation is all-or-nothing: a schema with a nameless or
//! example-less intent is rejected outright rather than served partially.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A named category of user request, with example utterances used both as
/// prompt context and as the batch-test/evaluation sample pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    /// Unique intent name (e.g., "book_flight").
    pub name: String,
    /// Example utterances. Validated non-empty.
    pub examples: Vec<String>,
    /// Entity slots this intent may fill (subset of `Schema::entities` keys).
    #[serde(default)]
    pub entities: BTreeSet<String>,
}

/// Static description of allowed intents and entity slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Ordered intent definitions.
    pub intents: Vec<Intent>,
    /// Entity name → human-readable description, embedded into prompts.
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
}

/// Malformed intent definition file. Fatal at load time.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read schema file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema has no intents")]
    NoIntents,

    #[error("intent at index {0} has an empty name")]
    EmptyName(usize),

    #[error("intent '{0}' has no examples")]
    NoExamples(String),

    #[error("duplicate intent name '{0}'")]
    DuplicateName(String),
}

impl Schema {
    /// Parse and validate a schema from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let schema: Schema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load and validate a schema from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        if self.intents.is_empty() {
            return Err(SchemaError::NoIntents);
        }

        let mut seen = HashSet::new();
        for (idx, intent) in self.intents.iter().enumerate() {
            if intent.name.trim().is_empty() {
                return Err(SchemaError::EmptyName(idx));
            }
            if intent.examples.is_empty() {
                return Err(SchemaError::NoExamples(intent.name.clone()));
            }
            if !seen.insert(intent.name.as_str()) {
                return Err(SchemaError::DuplicateName(intent.name.clone()));
            }
        }
        Ok(())
    }

    /// All intent names in schema order.
    pub fn intent_names(&self) -> Vec<&str> {
        self.intents.iter().map(|i| i.name.as_str()).collect()
    }

    /// Look up an intent by exact name.
    pub fn find_intent(&self, name: &str) -> Option<&Intent> {
        self.intents.iter().find(|i| i.name == name)
    }
}
