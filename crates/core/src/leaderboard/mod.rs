//! Leaderboard ranking and rendering.
//!
//! A query outcome is turned into exactly one of three replies: the ranked
//! table, the empty-leaderboard notice, or the retry-later notice. Only
//! [`LeaderboardResponder`] calls the formatter, and only for a non-empty
//! successful result.

pub mod format;

use std::fmt::Write as _;

use serde::Serialize;
use thiserror::Error;

use crate::domain::score::ScoreRecord;
use crate::replies::{
    empty_leaderboard_message, leaderboard_footer, LEADERBOARD_TITLE, RETRY_LATER_MESSAGE,
    TABLE_HEADER, TABLE_SEPARATOR,
};
use crate::reward::RewardTier;

pub use format::{escape_markdown, group_thousands, truncate_username, MAX_USERNAME_CHARS};

pub const LEADERBOARD_SIZE: usize = 10;

/// The store could not produce a result. Distinct from an empty leaderboard.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("leaderboard query failed: {reason}")]
pub struct QueryFailed {
    pub reason: String,
}

impl QueryFailed {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub high_score: u64,
    pub reward: RewardTier,
}

impl LeaderboardEntry {
    pub fn display_score(&self) -> String {
        group_thousands(self.high_score)
    }
}

/// Assigns ranks by input position; the input is expected in leaderboard order.
pub fn entries(records: &[ScoreRecord]) -> Vec<LeaderboardEntry> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| LeaderboardEntry {
            rank: index + 1,
            username: record.username.clone(),
            high_score: record.high_score,
            reward: RewardTier::for_referrals(record.referral_count),
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyFormat {
    Plain,
    Markdown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    pub format: ReplyFormat,
}

impl Reply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), format: ReplyFormat::Plain }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self { text: text.into(), format: ReplyFormat::Markdown }
    }
}

pub trait LeaderboardFormatter: Send + Sync {
    fn render(&self, records: &[ScoreRecord]) -> String;
}

#[derive(Clone, Debug)]
pub struct TableFormatter {
    game_link: String,
}

impl TableFormatter {
    pub fn new(game_link: impl Into<String>) -> Self {
        Self { game_link: game_link.into() }
    }
}

impl LeaderboardFormatter for TableFormatter {
    fn render(&self, records: &[ScoreRecord]) -> String {
        if records.is_empty() {
            return empty_leaderboard_message(&self.game_link);
        }

        let mut message = format!("{LEADERBOARD_TITLE}\n\n{TABLE_HEADER}\n{TABLE_SEPARATOR}\n");
        for entry in entries(records) {
            // Writing into a String cannot fail.
            let _ = writeln!(
                message,
                "{}. | {} | {} | {}",
                entry.rank,
                entry.display_score(),
                entry.reward,
                escape_markdown(&truncate_username(&entry.username))
            );
        }
        message.push('\n');
        message.push_str(&leaderboard_footer(&self.game_link));
        message
    }
}

pub struct LeaderboardResponder<F = TableFormatter> {
    formatter: F,
    game_link: String,
}

impl LeaderboardResponder<TableFormatter> {
    pub fn with_table(game_link: impl Into<String>) -> Self {
        let game_link = game_link.into();
        Self { formatter: TableFormatter::new(game_link.clone()), game_link }
    }
}

impl<F> LeaderboardResponder<F>
where
    F: LeaderboardFormatter,
{
    pub fn new(formatter: F, game_link: impl Into<String>) -> Self {
        Self { formatter, game_link: game_link.into() }
    }

    pub fn respond(&self, outcome: Result<Vec<ScoreRecord>, QueryFailed>) -> Reply {
        match outcome {
            Err(_) => Reply::plain(RETRY_LATER_MESSAGE),
            Ok(records) if records.is_empty() => {
                Reply::plain(empty_leaderboard_message(&self.game_link))
            }
            Ok(records) => Reply::markdown(self.formatter.render(&records)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{
        entries, LeaderboardFormatter, LeaderboardResponder, QueryFailed, ReplyFormat,
        TableFormatter,
    };
    use crate::domain::score::ScoreRecord;
    use crate::replies::{DEFAULT_GAME_LINK, RETRY_LATER_MESSAGE};
    use crate::reward::RewardTier;

    #[derive(Default)]
    struct CountingFormatter {
        calls: AtomicUsize,
    }

    impl LeaderboardFormatter for CountingFormatter {
        fn render(&self, records: &[ScoreRecord]) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("{} rows", records.len())
        }
    }

    fn sample() -> Vec<ScoreRecord> {
        vec![ScoreRecord::new("Ana", 125_000, 12), ScoreRecord::new("Bo", 98_000, 3)]
    }

    #[test]
    fn renders_rows_in_rank_order() {
        let responder = LeaderboardResponder::with_table(DEFAULT_GAME_LINK);
        let reply = responder.respond(Ok(sample()));

        assert_eq!(reply.format, ReplyFormat::Markdown);
        let rows: Vec<_> = reply
            .text
            .lines()
            .filter(|line| line.starts_with(|ch: char| ch.is_ascii_digit()))
            .collect();
        assert_eq!(rows, vec!["1. | 125,000 | x2.0 | Ana", "2. | 98,000 | x1.0 | Bo"]);
        assert!(reply.text.starts_with("🏆 *COINDASH OFFICIAL LEADERBOARD* 🏆\n\n"));
        assert!(reply.text.contains("Pos. | Score | Multiplier | Player\n--- | --- | --- | ---\n"));
        assert!(reply.text.ends_with(&format!(
            "\n\n\\*Total score includes the referral bonus. Play here: {DEFAULT_GAME_LINK}"
        )));
    }

    #[test]
    fn rendering_is_deterministic() {
        let formatter = TableFormatter::new(DEFAULT_GAME_LINK);
        assert_eq!(formatter.render(&sample()), formatter.render(&sample()));
    }

    #[test]
    fn empty_result_yields_notice_with_game_link() {
        let responder = LeaderboardResponder::with_table(DEFAULT_GAME_LINK);
        let reply = responder.respond(Ok(Vec::new()));

        assert_eq!(reply.format, ReplyFormat::Plain);
        assert_eq!(
            reply.text,
            "The leaderboard is empty! Be the first to play! Start the challenge here: https://giosubress.github.io/CoinDashGIKA/"
        );
        assert!(!reply.text.contains("Pos."));
    }

    #[test]
    fn table_formatter_never_renders_zero_row_table() {
        let rendered = TableFormatter::new("https://play.example").render(&[]);
        assert!(rendered.contains("https://play.example"));
        assert!(!rendered.contains("---"));
    }

    #[test]
    fn failed_query_skips_formatter() {
        let responder = LeaderboardResponder::new(CountingFormatter::default(), DEFAULT_GAME_LINK);

        let reply = responder.respond(Err(QueryFailed::new("timeout")));
        assert_eq!(reply.text, RETRY_LATER_MESSAGE);
        assert_eq!(reply.format, ReplyFormat::Plain);
        assert_eq!(responder.formatter.calls.load(Ordering::SeqCst), 0);

        responder.respond(Ok(Vec::new()));
        assert_eq!(responder.formatter.calls.load(Ordering::SeqCst), 0);

        let reply = responder.respond(Ok(sample()));
        assert_eq!(reply.text, "2 rows");
        assert_eq!(responder.formatter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reordering_input_reorders_ranks() {
        let mut reversed = sample();
        reversed.reverse();

        let ranked = entries(&reversed);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].username, "Bo");
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[1].username, "Ana");
    }

    #[test]
    fn fifty_referrals_render_as_top_multiplier() {
        let text = TableFormatter::new(DEFAULT_GAME_LINK)
            .render(&[ScoreRecord::new("Cy", 1_500, 50)]);
        assert!(text.contains("1. | 1,500 | x5.0 | Cy"));
        assert_eq!(entries(&[ScoreRecord::new("Cy", 1_500, 50)])[0].reward, RewardTier::Gold);
    }

    #[test]
    fn usernames_are_escaped_in_rows() {
        let text = TableFormatter::new(DEFAULT_GAME_LINK)
            .render(&[ScoreRecord::new("coin_king*", 10, 0)]);
        assert!(text.contains("1. | 10 | x1.0 | coin\\_king\\*"));
    }

    #[test]
    fn game_link_is_escaped_in_footer() {
        let text = TableFormatter::new("https://coin_dash.example/play_now")
            .render(&[ScoreRecord::new("Ana", 10, 0)]);
        assert!(text.ends_with("Play here: https://coin\\_dash.example/play\\_now"));
    }

    #[test]
    fn full_table_of_long_names_fits_one_telegram_message() {
        let records: Vec<_> = (0..10)
            .map(|index| ScoreRecord::new(format!("{index}{}", "_".repeat(499)), 1_000_000, 50))
            .collect();

        let text = TableFormatter::new(DEFAULT_GAME_LINK).render(&records);
        assert!(text.chars().count() < 4096, "rendered {} chars", text.chars().count());
        assert!(text.contains("…"));
    }
}
