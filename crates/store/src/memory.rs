use async_trait::async_trait;
use coindash_core::domain::score::rank_records;
use coindash_core::ScoreRecord;

use crate::{ScoreStore, ScoreStoreError};

/// Fixed set of records, served in the same order a live store would return them.
#[derive(Clone, Debug, Default)]
pub struct InMemoryScoreStore {
    records: Vec<ScoreRecord>,
}

impl InMemoryScoreStore {
    pub fn new(records: Vec<ScoreRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl ScoreStore for InMemoryScoreStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn fetch_top_scores(&self, limit: usize) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        Ok(rank_records(self.records.clone(), limit))
    }
}

#[cfg(test)]
mod tests {
    use coindash_core::ScoreRecord;

    use super::InMemoryScoreStore;
    use crate::ScoreStore;

    #[tokio::test]
    async fn returns_highest_scores_first_up_to_limit() {
        let store = InMemoryScoreStore::new(vec![
            ScoreRecord::new("low", 10, 0),
            ScoreRecord::new("high", 30, 0),
            ScoreRecord::new("mid", 20, 0),
        ]);

        let top = store.fetch_top_scores(2).await.expect("in-memory fetch");
        let names: Vec<_> = top.iter().map(|record| record.username.as_str()).collect();
        assert_eq!(names, vec!["high", "mid"]);
    }

    #[tokio::test]
    async fn empty_store_returns_empty_result() {
        let store = InMemoryScoreStore::default();
        assert!(store.fetch_top_scores(10).await.expect("fetch").is_empty());
        assert_eq!(store.backend(), "memory");
    }
}
