use std::sync::Arc;
use std::time::Duration;

use coindash_core::config::StoreConfig;
use reqwest::Client;
use tracing::info;

use crate::{FirestoreScoreStore, ScoreStore, ScoreStoreError};

pub fn http_client(timeout: Duration) -> Result<Client, ScoreStoreError> {
    Client::builder()
        .timeout(timeout.max(Duration::from_secs(1)))
        .user_agent(concat!("coindash-bot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|error| ScoreStoreError::Transport(error.without_url().to_string()))
}

/// Builds the process-wide store handle. Called once during startup.
pub fn connect(config: &StoreConfig) -> Result<Arc<dyn ScoreStore>, ScoreStoreError> {
    let client = http_client(Duration::from_secs(config.timeout_secs))?;
    let store = FirestoreScoreStore::new(client, config);

    info!(
        event_name = "system.store.configured",
        correlation_id = "bootstrap",
        backend = store.backend(),
        project_id = %config.project_id,
        collection = %store.collection_path(),
        "score store client initialized"
    );

    Ok(Arc::new(store))
}
