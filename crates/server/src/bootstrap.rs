use std::sync::Arc;
use std::time::Duration;

use coindash_core::config::{AppConfig, ConfigError, LoadOptions};
use coindash_store::{connect, LeaderboardQuery, ScoreStore, ScoreStoreError};
use coindash_telegram::{
    api::{BotApi, BotApiError, HttpBotApi},
    commands::CommandParser,
    events::command_dispatcher,
    processor::UpdateProcessor,
};
use thiserror::Error;
use tracing::info;

use crate::service::StoreBackedCommandService;

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<dyn ScoreStore>,
    pub bot_api: Arc<dyn BotApi>,
    pub processor: Arc<UpdateProcessor>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("score store setup failed: {0}")]
    Store(#[source] ScoreStoreError),
    #[error("telegram client setup failed: {0}")]
    BotClient(#[source] BotApiError),
    #[error("telegram rejected the bot token: {0}")]
    BotIdentity(#[source] BotApiError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        delivery_mode = config.telegram.delivery.as_str(),
        "starting application bootstrap"
    );

    let store = connect(&config.store).map_err(BootstrapError::Store)?;

    let bot_api: Arc<dyn BotApi> = Arc::new(
        HttpBotApi::new(
            &config.telegram.api_base_url,
            config.telegram.bot_token.clone(),
            config.telegram.poll_timeout_secs,
        )
        .map_err(BootstrapError::BotClient)?,
    );

    let me = bot_api.get_me().await.map_err(BootstrapError::BotIdentity)?;
    info!(
        event_name = "system.bootstrap.bot_identified",
        correlation_id = "bootstrap",
        bot_id = me.id,
        bot_username = me.username.as_deref().unwrap_or("unknown"),
        "telegram bot identity confirmed"
    );

    let processor = build_processor(&config, store.clone(), bot_api.clone(), me.username);

    Ok(Application { config, store, bot_api, processor: Arc::new(processor) })
}

/// Wires the store-backed command service into an update processor.
pub fn build_processor(
    config: &AppConfig,
    store: Arc<dyn ScoreStore>,
    bot_api: Arc<dyn BotApi>,
    bot_username: Option<String>,
) -> UpdateProcessor {
    let query = LeaderboardQuery::new(store, Duration::from_secs(config.store.timeout_secs));
    let service = StoreBackedCommandService::new(query, &config.game.link);
    let dispatcher = command_dispatcher(service, CommandParser::new(bot_username));
    UpdateProcessor::new(dispatcher, bot_api)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use coindash_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use coindash_core::ScoreRecord;
    use coindash_store::InMemoryScoreStore;
    use coindash_telegram::api::{BotApi, BotApiError, BotUser, Chat, Message, Update};
    use coindash_telegram::messages::{OutgoingMessage, ParseMode};
    use coindash_telegram::processor::ProcessOutcome;
    use tokio::sync::Mutex;

    use crate::bootstrap::{bootstrap, build_processor};

    #[derive(Default)]
    struct RecordingApi {
        sent: Mutex<Vec<OutgoingMessage>>,
    }

    #[async_trait]
    impl BotApi for RecordingApi {
        async fn get_me(&self) -> Result<BotUser, BotApiError> {
            Err(BotApiError::Transport("unused".to_owned()))
        }

        async fn get_updates(
            &self,
            _offset: Option<i64>,
            _timeout_secs: u64,
        ) -> Result<Vec<Update>, BotApiError> {
            Ok(Vec::new())
        }

        async fn send_message(&self, message: &OutgoingMessage) -> Result<(), BotApiError> {
            self.sent.lock().await.push(message.clone());
            Ok(())
        }

        async fn set_webhook(&self, _url: &str, _secret_token: &str) -> Result<(), BotApiError> {
            Ok(())
        }

        async fn delete_webhook(&self) -> Result<(), BotApiError> {
            Ok(())
        }
    }

    fn command(update_id: i64, text: &str) -> Update {
        Update {
            update_id,
            message: Some(Message {
                message_id: update_id,
                chat: Chat { id: 77, kind: "supergroup".to_owned() },
                from: None,
                text: Some(text.to_owned()),
            }),
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_bot_token() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                bot_token: Some(String::new()),
                store_project_id: Some("coindash-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("telegram.bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_store_project() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                bot_token: Some("123456:test-token".to_string()),
                store_project_id: Some(String::new()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("store.project_id"));
    }

    #[tokio::test]
    async fn wired_processor_answers_commands_end_to_end() {
        let api = Arc::new(RecordingApi::default());
        let store = Arc::new(InMemoryScoreStore::new(vec![
            ScoreRecord::new("top_gun", 2_500, 50),
            ScoreRecord::new("runner", 1_200, 5),
        ]));
        let processor = build_processor(
            &AppConfig::default(),
            store,
            api.clone(),
            Some("CoinDashBot".to_owned()),
        );

        assert_eq!(processor.process(&command(1, "/start")).await, ProcessOutcome::Replied);
        assert_eq!(
            processor.process(&command(2, "/leaderboard@CoinDashBot")).await,
            ProcessOutcome::Replied
        );
        assert_eq!(processor.process(&command(3, "/leaderboard@Other")).await, ProcessOutcome::Ignored);

        let sent = api.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].parse_mode, None);
        assert_eq!(sent[1].parse_mode, Some(ParseMode::Markdown));
        assert!(sent[1].text.contains("1. | 2,500 | x5.0 | top\\_gun"));
        assert!(sent[1].text.contains("2. | 1,200 | x1.5 | runner"));
    }
}
