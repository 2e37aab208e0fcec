//! Fixed user-facing texts.

use crate::leaderboard::escape_markdown;

pub const DEFAULT_GAME_LINK: &str = "https://giosubress.github.io/CoinDashGIKA/";

pub const WELCOME_MESSAGE: &str = "Welcome to the CoinDash Bot! 🚀 I'm here to show you the latest leaderboard. Use the /leaderboard command to see the Top 10!";

pub const RETRY_LATER_MESSAGE: &str =
    "Could not load the leaderboard right now. Please try again later.";

pub const LEADERBOARD_TITLE: &str = "🏆 *COINDASH OFFICIAL LEADERBOARD* 🏆";

pub const TABLE_HEADER: &str = "Pos. | Score | Multiplier | Player";

pub const TABLE_SEPARATOR: &str = "--- | --- | --- | ---";

pub fn empty_leaderboard_message(game_link: &str) -> String {
    format!("The leaderboard is empty! Be the first to play! Start the challenge here: {game_link}")
}

/// Closing line of the Markdown table; the link is escaped like any other text.
pub fn leaderboard_footer(game_link: &str) -> String {
    format!(
        "\\*Total score includes the referral bonus. Play here: {}",
        escape_markdown(game_link)
    )
}
