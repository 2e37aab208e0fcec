//! Bot API types and client.
//!
//! Only the fields and methods the bot relies on are modelled; unknown JSON
//! fields are ignored on deserialization.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::messages::OutgoingMessage;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<BotUser>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BotUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BotApiError {
    #[error("bot api request failed: {0}")]
    Transport(String),
    #[error("bot api error {code}: {description}")]
    Api { code: i64, description: String },
    #[error("bot api rate limited; retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("bot api response could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_me(&self) -> Result<BotUser, BotApiError>;
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, BotApiError>;
    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), BotApiError>;
    async fn set_webhook(&self, url: &str, secret_token: &str) -> Result<(), BotApiError>;
    async fn delete_webhook(&self) -> Result<(), BotApiError>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Serialize)]
struct GetUpdatesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct SetWebhookRequest<'a> {
    url: &'a str,
    secret_token: &'a str,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct DeleteWebhookRequest {
    drop_pending_updates: bool,
}

const ALLOWED_UPDATES: &[&str] = &["message"];

/// Bot API over HTTPS. The bot token is part of every method URL, so request
/// errors are stripped of their URL before being surfaced.
pub struct HttpBotApi {
    client: Client,
    api_base_url: String,
    bot_token: SecretString,
}

impl HttpBotApi {
    /// `poll_timeout_secs` sizes the client timeout so long polls are not cut short.
    pub fn new(
        api_base_url: &str,
        bot_token: SecretString,
        poll_timeout_secs: u64,
    ) -> Result<Self, BotApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .user_agent(concat!("coindash-bot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| BotApiError::Transport(error.without_url().to_string()))?;

        Ok(Self { client, api_base_url: api_base_url.trim_end_matches('/').to_owned(), bot_token })
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, BotApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/bot{}/{method}", self.api_base_url, self.bot_token.expose_secret());
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|error| BotApiError::Transport(error.without_url().to_string()))?;

        let status = response.status();
        let payload: ApiResponse<T> = response
            .json()
            .await
            .map_err(|error| BotApiError::Decode(error.without_url().to_string()))?;
        debug!(method, status = status.as_u16(), ok = payload.ok, "bot api call completed");

        into_result(payload)
    }
}

fn into_result<T>(payload: ApiResponse<T>) -> Result<T, BotApiError> {
    if payload.ok {
        return payload
            .result
            .ok_or_else(|| BotApiError::Decode("response marked ok without result".to_owned()));
    }

    if let Some(retry_after_secs) = payload.parameters.and_then(|params| params.retry_after) {
        return Err(BotApiError::RateLimited { retry_after_secs });
    }

    Err(BotApiError::Api {
        code: payload.error_code.unwrap_or_default(),
        description: payload.description.unwrap_or_else(|| "unknown error".to_owned()),
    })
}

#[async_trait]
impl BotApi for HttpBotApi {
    async fn get_me(&self) -> Result<BotUser, BotApiError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, BotApiError> {
        let request =
            GetUpdatesRequest { offset, timeout: timeout_secs, allowed_updates: ALLOWED_UPDATES };
        self.call("getUpdates", &request).await
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), BotApiError> {
        let _: serde_json::Value = self.call("sendMessage", message).await?;
        Ok(())
    }

    async fn set_webhook(&self, url: &str, secret_token: &str) -> Result<(), BotApiError> {
        let request = SetWebhookRequest { url, secret_token, allowed_updates: ALLOWED_UPDATES };
        let _: bool = self.call("setWebhook", &request).await?;
        Ok(())
    }

    async fn delete_webhook(&self) -> Result<(), BotApiError> {
        let _: bool =
            self.call("deleteWebhook", &DeleteWebhookRequest { drop_pending_updates: false }).await?;
        Ok(())
    }
}
