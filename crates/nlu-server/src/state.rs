//! Shared application state for the Axum server.
//!
//! The schema is loaded once and shared read-only; the history log is the
//! only mutable shared store. The random source for sample selection is
//! held in state so tests can seed it deterministically.

use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use nlu_core::history::HistoryLog;
use nlu_core::schema::Schema;

use crate::adapters::{AdapterFactory, ConfigAdapterFactory};
use crate::config::ServerConfig;

/// Shared application state, cloned into each Axum handler.
#[derive(Clone)]
pub struct AppState {
    /// Intent schema, immutable for the process lifetime.
    pub schema: Arc<Schema>,
    /// Loaded configuration (model defaults, paths).
    pub config: Arc<ServerConfig>,
    /// Append-only interaction log.
    pub history: Arc<HistoryLog>,
    /// Builds model adapters per request.
    pub adapters: Arc<dyn AdapterFactory>,
    /// Random source for evaluation/batch sampling.
    rng: Arc<Mutex<StdRng>>,
}

impl AppState {
    /// Production wiring: history path and adapter factory from config,
    /// entropy-seeded sampling.
    pub fn new(schema: Arc<Schema>, config: Arc<ServerConfig>) -> Self {
        let history = Arc::new(HistoryLog::new(config.history_path.clone()));
        let adapters = Arc::new(ConfigAdapterFactory::new(Arc::clone(&config)));
        Self::with_parts(schema, config, history, adapters, None)
    }

    /// Explicit wiring with an optional deterministic seed (tests).
    pub fn with_parts(
        schema: Arc<Schema>,
        config: Arc<ServerConfig>,
        history: Arc<HistoryLog>,
        adapters: Arc<dyn AdapterFactory>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            schema,
            config,
            history,
            adapters,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Uniform random sample of up to `count` items, without replacement.
    pub fn sample(&self, items: &[String], count: usize) -> Vec<String> {
        let mut rng = self.rng.lock().expect("sampling rng mutex poisoned");
        items
            .choose_multiple(&mut *rng, count.min(items.len()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn seeded_state(seed: u64) -> AppState {
        let schema = Arc::new(
            Schema::from_json_str(
                r#"{"intents": [{"name": "greet", "examples": ["hi"]}], "entities": {}}"#,
            )
            .unwrap(),
        );
        let config = Arc::new(ServerConfig::default());
        let history = Arc::new(HistoryLog::new(
            std::env::temp_dir().join("nlu-state-test.jsonl"),
        ));
        let adapters = Arc::new(ConfigAdapterFactory::new(Arc::clone(&config)));
        AppState::with_parts(schema, config, history, adapters, Some(seed))
    }

    fn items(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("example {i}")).collect()
    }

    #[test]
    fn sample_is_without_replacement() {
        let state = seeded_state(7);
        let sampled = state.sample(&items(10), 5);
        assert_eq!(sampled.len(), 5);
        let unique: HashSet<_> = sampled.iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn sample_clamps_to_population() {
        let state = seeded_state(7);
        assert_eq!(state.sample(&items(3), 10).len(), 3);
    }

    #[test]
    fn same_seed_same_sample() {
        let pool = items(20);
        let a = seeded_state(42).sample(&pool, 5);
        let b = seeded_state(42).sample(&pool, 5);
        assert_eq!(a, b);
    }
}
