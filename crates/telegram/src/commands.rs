use async_trait::async_trait;
use coindash_core::replies::WELCOME_MESSAGE;
use coindash_core::Reply;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Leaderboard,
    Unknown(String),
}

impl BotCommand {
    pub fn name(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Leaderboard => "leaderboard",
            Self::Unknown(name) => name,
        }
    }
}

/// Recognizes `/name` and `/name@BotName` at the start of a message.
///
/// With a known bot username, commands addressed to a different bot are
/// dropped so that group chats with several bots stay quiet.
#[derive(Clone, Debug, Default)]
pub struct CommandParser {
    bot_username: Option<String>,
}

impl CommandParser {
    pub fn new(bot_username: Option<String>) -> Self {
        Self { bot_username: bot_username.map(|name| name.trim_start_matches('@').to_owned()) }
    }

    pub fn bot_username(&self) -> Option<&str> {
        self.bot_username.as_deref()
    }

    pub fn parse(&self, text: &str) -> Option<BotCommand> {
        let token = text.trim_start().split_whitespace().next()?;
        let token = token.strip_prefix('/')?;
        let (name, target) = match token.split_once('@') {
            Some((name, target)) => (name, Some(target)),
            None => (token, None),
        };

        if name.is_empty() {
            return None;
        }

        if let (Some(target), Some(own)) = (target, self.bot_username.as_deref()) {
            if !target.eq_ignore_ascii_case(own) {
                return None;
            }
        }

        let command = match name.to_ascii_lowercase().as_str() {
            "start" => BotCommand::Start,
            "help" => BotCommand::Help,
            "leaderboard" => BotCommand::Leaderboard,
            other => BotCommand::Unknown(other.to_owned()),
        };
        Some(command)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandContext {
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub message_id: i64,
    pub correlation_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

#[async_trait]
pub trait BotCommandService: Send + Sync {
    async fn leaderboard(&self, ctx: &CommandContext) -> Result<Reply, CommandRouteError>;
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: BotCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// `None` means the command gets no reply.
    pub async fn route(
        &self,
        command: &BotCommand,
        ctx: &CommandContext,
    ) -> Result<Option<Reply>, CommandRouteError> {
        match command {
            BotCommand::Start | BotCommand::Help => Ok(Some(Reply::plain(WELCOME_MESSAGE))),
            BotCommand::Leaderboard => self.service.leaderboard(ctx).await.map(Some),
            BotCommand::Unknown(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use coindash_core::replies::WELCOME_MESSAGE;
    use coindash_core::{Reply, ReplyFormat};

    use super::{
        BotCommand, BotCommandService, CommandContext, CommandParser, CommandRouteError,
        CommandRouter,
    };

    #[derive(Default)]
    struct RecordingService {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BotCommandService for RecordingService {
        async fn leaderboard(&self, ctx: &CommandContext) -> Result<Reply, CommandRouteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::markdown(format!("table for {}", ctx.chat_id)))
        }
    }

    fn ctx() -> CommandContext {
        CommandContext {
            chat_id: 77,
            user_id: Some(5),
            message_id: 1,
            correlation_id: "update-1".to_owned(),
        }
    }

    #[test]
    fn parses_plain_and_addressed_commands() {
        let parser = CommandParser::new(Some("CoinDashGika_bot".to_owned()));

        assert_eq!(parser.parse("/start"), Some(BotCommand::Start));
        assert_eq!(parser.parse("/help"), Some(BotCommand::Help));
        assert_eq!(parser.parse("/leaderboard"), Some(BotCommand::Leaderboard));
        assert_eq!(parser.parse("  /Leaderboard please"), Some(BotCommand::Leaderboard));
        assert_eq!(parser.parse("/leaderboard@CoinDashGika_bot"), Some(BotCommand::Leaderboard));
        assert_eq!(parser.parse("/leaderboard@coindashgika_BOT"), Some(BotCommand::Leaderboard));
        assert_eq!(parser.parse("/stats"), Some(BotCommand::Unknown("stats".to_owned())));
    }

    #[test]
    fn ignores_non_commands_and_other_bots() {
        let parser = CommandParser::new(Some("@CoinDashGika_bot".to_owned()));

        assert_eq!(parser.bot_username(), Some("CoinDashGika_bot"));
        assert_eq!(parser.parse("leaderboard"), None);
        assert_eq!(parser.parse("hello /leaderboard"), None);
        assert_eq!(parser.parse("/"), None);
        assert_eq!(parser.parse(""), None);
        assert_eq!(parser.parse("/leaderboard@OtherBot"), None);
    }

    #[test]
    fn unknown_bot_username_accepts_any_addressee() {
        let parser = CommandParser::default();
        assert_eq!(parser.parse("/leaderboard@AnyBot"), Some(BotCommand::Leaderboard));
    }

    #[tokio::test]
    async fn start_and_help_reply_with_welcome_without_service_call() {
        let router = CommandRouter::new(RecordingService::default());

        for command in [BotCommand::Start, BotCommand::Help] {
            let reply = router.route(&command, &ctx()).await.expect("route").expect("reply");
            assert_eq!(reply.text, WELCOME_MESSAGE);
            assert_eq!(reply.format, ReplyFormat::Plain);
        }
        assert_eq!(router.service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn leaderboard_delegates_to_service_once() {
        let router = CommandRouter::new(RecordingService::default());

        let reply =
            router.route(&BotCommand::Leaderboard, &ctx()).await.expect("route").expect("reply");
        assert_eq!(reply, Reply::markdown("table for 77"));
        assert_eq!(router.service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_commands_get_no_reply() {
        let router = CommandRouter::new(RecordingService::default());
        let reply = router.route(&BotCommand::Unknown("stats".to_owned()), &ctx()).await;
        assert_eq!(reply, Ok(None));
        assert_eq!(BotCommand::Unknown("stats".to_owned()).name(), "stats");
    }
}
