use std::sync::Arc;
use std::time::Duration;

use coindash_core::{rank_records, QueryFailed, ScoreRecord, LEADERBOARD_SIZE};
use tracing::{debug, warn};

use crate::{ScoreStore, ScoreStoreError};

/// Extra rows requested beyond the limit so ties at the cut are visible.
const TIE_MARGIN: usize = 10;
const MAX_FETCH: usize = 640;

/// Top-of-leaderboard read with a bounded wait.
///
/// Every store failure and every timeout collapses into [`QueryFailed`], so
/// callers only distinguish "no answer" from "an answer, possibly empty".
#[derive(Clone)]
pub struct LeaderboardQuery {
    store: Arc<dyn ScoreStore>,
    timeout: Duration,
    limit: usize,
}

impl LeaderboardQuery {
    pub fn new(store: Arc<dyn ScoreStore>, timeout: Duration) -> Self {
        Self { store, timeout, limit: LEADERBOARD_SIZE }
    }

    pub fn store(&self) -> &Arc<dyn ScoreStore> {
        &self.store
    }

    pub async fn top_scores(&self) -> Result<Vec<ScoreRecord>, QueryFailed> {
        let backend = self.store.backend();
        match tokio::time::timeout(self.timeout, self.fetch_ranked()).await {
            Ok(Ok(ranked)) => {
                debug!(
                    event_name = "leaderboard.query.completed",
                    backend,
                    rows = ranked.len(),
                    "leaderboard query completed"
                );
                Ok(ranked)
            }
            Ok(Err(error)) => {
                warn!(
                    event_name = "leaderboard.query.failed",
                    backend,
                    error = %error,
                    "leaderboard query failed"
                );
                Err(QueryFailed::new(error.to_string()))
            }
            Err(_) => {
                warn!(
                    event_name = "leaderboard.query.timed_out",
                    backend,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "leaderboard query timed out"
                );
                Err(QueryFailed::new(format!(
                    "timed out after {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }

    /// Stores only order by score, so which of several players tied at the
    /// last place make the cut is up to them. The window grows until the
    /// lowest fetched score sits strictly below the last ranked score or
    /// the store runs out of rows.
    async fn fetch_ranked(&self) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
        let mut fetch_size = self.limit + TIE_MARGIN;
        loop {
            let records = self.store.fetch_top_scores(fetch_size).await?;
            let exhausted = records.len() < fetch_size;
            let lowest_fetched = records.iter().map(|record| record.high_score).min();
            let ranked = rank_records(records, self.limit);

            let cut_is_tied = ranked.len() == self.limit
                && lowest_fetched == ranked.last().map(|record| record.high_score);
            if exhausted || !cut_is_tied || fetch_size >= MAX_FETCH {
                return Ok(ranked);
            }

            debug!(
                event_name = "leaderboard.query.widened",
                fetch_size,
                "tie at the leaderboard cut; widening fetch window"
            );
            fetch_size = (fetch_size * 2).min(MAX_FETCH);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use coindash_core::ScoreRecord;
    use tokio::sync::Mutex;

    use super::LeaderboardQuery;
    use crate::{InMemoryScoreStore, ScoreStore, ScoreStoreError};

    struct FailingStore(ScoreStoreError);

    #[async_trait]
    impl ScoreStore for FailingStore {
        fn backend(&self) -> &'static str {
            "failing"
        }

        async fn fetch_top_scores(
            &self,
            _limit: usize,
        ) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
            Err(self.0.clone())
        }
    }

    struct SlowStore;

    #[async_trait]
    impl ScoreStore for SlowStore {
        fn backend(&self) -> &'static str {
            "slow"
        }

        async fn fetch_top_scores(
            &self,
            _limit: usize,
        ) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
    }

    // Returns rows in raw insertion order to mimic a store with no secondary sort.
    struct UnorderedStore(Vec<ScoreRecord>);

    // Sorts by score only (stable, so insertion order decides ties) and
    // truncates to the requested limit, like a single-field `orderBy`.
    struct ScoreOnlyStore {
        records: Vec<ScoreRecord>,
        requested: Mutex<Vec<usize>>,
    }

    impl ScoreOnlyStore {
        fn new(records: Vec<ScoreRecord>) -> Self {
            Self { records, requested: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl ScoreStore for ScoreOnlyStore {
        fn backend(&self) -> &'static str {
            "score-only"
        }

        async fn fetch_top_scores(
            &self,
            limit: usize,
        ) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
            self.requested.lock().await.push(limit);
            let mut records = self.records.clone();
            records.sort_by(|left, right| right.high_score.cmp(&left.high_score));
            records.truncate(limit);
            Ok(records)
        }
    }

    #[async_trait]
    impl ScoreStore for UnorderedStore {
        fn backend(&self) -> &'static str {
            "unordered"
        }

        async fn fetch_top_scores(
            &self,
            _limit: usize,
        ) -> Result<Vec<ScoreRecord>, ScoreStoreError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn store_errors_collapse_to_query_failed() {
        let query = LeaderboardQuery::new(
            Arc::new(FailingStore(ScoreStoreError::Unauthorized(401))),
            Duration::from_secs(1),
        );

        let failure = query.top_scores().await.expect_err("must fail");
        assert!(failure.reason.contains("401"));
    }

    #[tokio::test]
    async fn timeout_is_a_query_failure() {
        let query = LeaderboardQuery::new(Arc::new(SlowStore), Duration::from_millis(20));
        let failure = query.top_scores().await.expect_err("must time out");
        assert!(failure.reason.contains("timed out"));
    }

    #[tokio::test]
    async fn empty_store_is_not_a_failure() {
        let query =
            LeaderboardQuery::new(Arc::new(InMemoryScoreStore::default()), Duration::from_secs(1));
        assert_eq!(query.top_scores().await, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn equal_scores_are_ordered_by_username() {
        let query = LeaderboardQuery::new(
            Arc::new(UnorderedStore(vec![
                ScoreRecord::new("zed", 100, 0),
                ScoreRecord::new("amy", 100, 0),
                ScoreRecord::new("top", 300, 0),
            ])),
            Duration::from_secs(1),
        );

        let names: Vec<_> = query
            .top_scores()
            .await
            .expect("query succeeds")
            .into_iter()
            .map(|record| record.username)
            .collect();
        assert_eq!(names, vec!["top", "amy", "zed"]);
    }

    #[tokio::test]
    async fn never_returns_more_than_ten_rows() {
        let records = (0..25).map(|index| ScoreRecord::new(format!("p{index}"), index, 0));
        let query = LeaderboardQuery::new(
            Arc::new(UnorderedStore(records.collect())),
            Duration::from_secs(1),
        );
        let top = query.top_scores().await.expect("query succeeds");
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].high_score, 24);
    }

    #[tokio::test]
    async fn tie_at_the_cut_is_broken_by_username() {
        let mut records: Vec<_> =
            (0..9).map(|index| ScoreRecord::new(format!("p{index}"), 1_000 + index, 0)).collect();
        records.push(ScoreRecord::new("zed", 100, 0));
        records.push(ScoreRecord::new("amy", 100, 0));
        let store = Arc::new(ScoreOnlyStore::new(records));
        let query = LeaderboardQuery::new(store.clone(), Duration::from_secs(1));

        let top = query.top_scores().await.expect("query succeeds");

        assert_eq!(top.len(), 10);
        assert_eq!(top[9].username, "amy");
        assert_eq!(store.requested.lock().await.clone(), vec![20]);
    }

    #[tokio::test]
    async fn wide_ties_widen_the_fetch_until_the_cut_is_settled() {
        // Reverse-alphabetical insertion so the store's own tie order is the worst case.
        let records: Vec<_> =
            (0..50).rev().map(|index| ScoreRecord::new(format!("u{index:02}"), 500, 0)).collect();
        let store = Arc::new(ScoreOnlyStore::new(records));
        let query = LeaderboardQuery::new(store.clone(), Duration::from_secs(1));

        let names: Vec<_> = query
            .top_scores()
            .await
            .expect("query succeeds")
            .into_iter()
            .map(|record| record.username)
            .collect();

        let expected: Vec<_> = (0..10).map(|index| format!("u{index:02}")).collect();
        assert_eq!(names, expected);
        assert_eq!(store.requested.lock().await.clone(), vec![20, 40, 80]);
    }

    #[tokio::test]
    async fn untied_cut_needs_a_single_fetch() {
        let records: Vec<_> =
            (0..30).map(|index| ScoreRecord::new(format!("p{index}"), index, 0)).collect();
        let store = Arc::new(ScoreOnlyStore::new(records));
        let query = LeaderboardQuery::new(store.clone(), Duration::from_secs(1));

        let top = query.top_scores().await.expect("query succeeds");
        assert_eq!(top[0].high_score, 29);
        assert_eq!(top[9].high_score, 20);
        assert_eq!(store.requested.lock().await.clone(), vec![20]);
    }
}
