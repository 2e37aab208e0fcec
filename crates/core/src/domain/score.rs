use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

pub const ANONYMOUS_USERNAME: &str = "Anonymous";

/// One stored score document as read from the score collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub username: String,
    #[serde(default)]
    pub high_score: u64,
    #[serde(default)]
    pub referral_count: u64,
}

impl ScoreRecord {
    pub fn new(username: impl Into<String>, high_score: u64, referral_count: u64) -> Self {
        let username = username.into();
        let username = if username.trim().is_empty() {
            ANONYMOUS_USERNAME.to_owned()
        } else {
            username
        };
        Self { username, high_score, referral_count }
    }
}

/// Highest score first; equal scores fall back to username ascending.
pub fn leaderboard_order(left: &ScoreRecord, right: &ScoreRecord) -> Ordering {
    right.high_score.cmp(&left.high_score).then_with(|| left.username.cmp(&right.username))
}

/// Sorts into leaderboard order and keeps at most `limit` records.
pub fn rank_records(mut records: Vec<ScoreRecord>, limit: usize) -> Vec<ScoreRecord> {
    records.sort_by(leaderboard_order);
    records.truncate(limit);
    records
}

#[cfg(test)]
mod tests {
    use super::{rank_records, ScoreRecord, ANONYMOUS_USERNAME};

    #[test]
    fn blank_username_becomes_anonymous() {
        assert_eq!(ScoreRecord::new("   ", 10, 0).username, ANONYMOUS_USERNAME);
        assert_eq!(ScoreRecord::new("Ana", 10, 0).username, "Ana");
    }

    #[test]
    fn ranks_by_score_then_username() {
        let ranked = rank_records(
            vec![
                ScoreRecord::new("Cy", 500, 0),
                ScoreRecord::new("Bo", 900, 1),
                ScoreRecord::new("Al", 500, 7),
            ],
            10,
        );

        let names: Vec<_> = ranked.iter().map(|record| record.username.as_str()).collect();
        assert_eq!(names, vec!["Bo", "Al", "Cy"]);
    }

    #[test]
    fn truncates_to_limit() {
        let records = (0..15).map(|index| ScoreRecord::new(format!("p{index:02}"), index, 0));
        let ranked = rank_records(records.collect(), 10);
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].high_score, 14);
        assert_eq!(ranked[9].high_score, 5);
    }

    #[test]
    fn missing_numeric_fields_deserialize_as_zero() {
        let record: ScoreRecord =
            toml::from_str("username = \"Dee\"").expect("record without numeric fields");
        assert_eq!(record, ScoreRecord::new("Dee", 0, 0));
    }
}
