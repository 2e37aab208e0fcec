use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use coindash_core::config::TelegramConfig;
use coindash_telegram::{
    api::{BotApi, BotApiError, Update},
    processor::UpdateProcessor,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
pub struct WebhookState {
    processor: Arc<UpdateProcessor>,
    secret: SecretString,
}

impl WebhookState {
    pub fn new(processor: Arc<UpdateProcessor>, secret: SecretString) -> Self {
        Self { processor, secret }
    }
}

pub fn router(path: &str, state: WebhookState) -> Router {
    Router::new().route(path, post(receive)).with_state(state)
}

/// Registers the public endpoint with Telegram so updates are pushed to us.
pub async fn register(api: &dyn BotApi, config: &TelegramConfig) -> Result<(), BotApiError> {
    let (Some(endpoint), Some(secret)) = (config.webhook_endpoint(), &config.webhook_secret)
    else {
        return Err(BotApiError::Api {
            code: 0,
            description: "webhook delivery needs telegram.webhook_url and telegram.webhook_secret"
                .to_owned(),
        });
    };

    api.set_webhook(&endpoint, secret.expose_secret()).await?;
    info!(
        event_name = "system.webhook.registered",
        correlation_id = "bootstrap",
        endpoint = %endpoint,
        "telegram webhook registered"
    );
    Ok(())
}

/// Every request carrying the right secret gets 200, malformed bodies included.
async fn receive(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let provided = headers.get(SECRET_HEADER).and_then(|value| value.to_str().ok());
    if provided != Some(state.secret.expose_secret()) {
        warn!(
            event_name = "ingress.telegram.webhook_rejected",
            secret_present = provided.is_some(),
            "rejected webhook request with invalid secret token"
        );
        return StatusCode::UNAUTHORIZED;
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(error) => {
            warn!(
                event_name = "ingress.telegram.webhook_malformed",
                error = %error,
                "discarding malformed webhook update"
            );
            return StatusCode::OK;
        }
    };

    state.processor.process(&update).await;
    StatusCode::OK
}
