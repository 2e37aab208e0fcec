pub mod config;
pub mod domain;
pub mod errors;
pub mod leaderboard;
pub mod replies;
pub mod reward;

pub use domain::score::{rank_records, ScoreRecord};
pub use errors::{ApplicationError, DomainError};
pub use leaderboard::{
    LeaderboardEntry, LeaderboardFormatter, LeaderboardResponder, QueryFailed, Reply,
    ReplyFormat, TableFormatter, LEADERBOARD_SIZE,
};
pub use reward::RewardTier;
