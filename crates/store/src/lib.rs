pub mod client;
pub mod firestore;
pub mod memory;
pub mod query;

use async_trait::async_trait;
use coindash_core::ScoreRecord;
use thiserror::Error;

pub use client::{connect, http_client};
pub use firestore::FirestoreScoreStore;
pub use memory::InMemoryScoreStore;
pub use query::LeaderboardQuery;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScoreStoreError {
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("store rejected credentials (http {0})")]
    Unauthorized(u16),
    #[error("store returned http {status}: {message}")]
    Status { status: u16, message: String },
    #[error("store response could not be decoded: {0}")]
    Decode(String),
}

/// Read-only access to the score collection.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Up to `limit` records ordered by high score, highest first.
    async fn fetch_top_scores(&self, limit: usize) -> Result<Vec<ScoreRecord>, ScoreStoreError>;
}
