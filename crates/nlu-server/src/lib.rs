//! NLU engine REST server — library crate.
//!
//! Re-exports all modules so the binary (`main.rs`) and integration tests
//! can access internal types like `AppState` and `build_router`.

pub mod adapters;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
