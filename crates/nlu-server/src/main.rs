//! NLU engine REST server binary.
//!
//! Loads the configuration and intent schema, then serves the REST surface
//! consumed by the frontend. A malformed schema refuses to start: serving a
//! partially valid schema would silently skew every prediction and metric.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use nlu_core::schema::Schema;
use nlu_server::config::ServerConfig;
use nlu_server::routes;
use nlu_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "nlu-server starting");

    let config = Arc::new(ServerConfig::load());

    let schema = Schema::from_file(&config.schema_path).map_err(|e| {
        tracing::error!(path = %config.schema_path, error = %e, "schema rejected, refusing to serve");
        anyhow::anyhow!("invalid intent schema: {e}")
    })?;
    tracing::info!(
        intents = schema.intents.len(),
        entities = schema.entities.len(),
        "intent schema loaded"
    );

    if config.remote.api_key.is_none() {
        tracing::warn!("remote backend has no API key configured; /compare_models will report zeroed remote metrics");
    }

    let state = AppState::new(Arc::new(schema), Arc::clone(&config));
    let app = routes::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
