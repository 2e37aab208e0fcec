use async_trait::async_trait;
use coindash_core::{LeaderboardResponder, Reply};
use coindash_store::LeaderboardQuery;
use coindash_telegram::commands::{BotCommandService, CommandContext, CommandRouteError};
use tracing::info;

/// Answers `/leaderboard` from the score store. Store failures never reach
/// the caller as errors; they become the retry-later reply.
pub struct StoreBackedCommandService {
    query: LeaderboardQuery,
    responder: LeaderboardResponder,
}

impl StoreBackedCommandService {
    pub fn new(query: LeaderboardQuery, game_link: &str) -> Self {
        Self { query, responder: LeaderboardResponder::with_table(game_link) }
    }
}

#[async_trait]
impl BotCommandService for StoreBackedCommandService {
    async fn leaderboard(&self, ctx: &CommandContext) -> Result<Reply, CommandRouteError> {
        let outcome = self.query.top_scores().await;
        let query_failed = outcome.is_err();
        let rows = outcome.as_ref().map(Vec::len).unwrap_or_default();
        let reply = self.responder.respond(outcome);

        info!(
            event_name = "leaderboard.reply.built",
            correlation_id = %ctx.correlation_id,
            chat_id = ctx.chat_id,
            rows,
            query_failed,
            "leaderboard reply built"
        );
        Ok(reply)
    }
}
