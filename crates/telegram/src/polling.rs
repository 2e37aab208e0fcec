use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    api::{BotApi, BotApiError, Update},
    processor::UpdateProcessor,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("long polling setup failed: {0}")]
    Setup(BotApiError),
    #[error("long polling gave up after {attempts} consecutive failures: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: BotApiError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn prepare(&self) -> Result<(), BotApiError>;
    /// `Ok(None)` ends the stream.
    async fn poll(&self, offset: Option<i64>) -> Result<Option<Vec<Update>>, BotApiError>;
}

/// `getUpdates` long polling. Any registered webhook is removed first, since
/// the Bot API refuses `getUpdates` while one is active.
pub struct HttpUpdateSource {
    api: Arc<dyn BotApi>,
    timeout_secs: u64,
}

impl HttpUpdateSource {
    pub fn new(api: Arc<dyn BotApi>, timeout_secs: u64) -> Self {
        Self { api, timeout_secs }
    }
}

#[async_trait]
impl UpdateSource for HttpUpdateSource {
    async fn prepare(&self) -> Result<(), BotApiError> {
        self.api.delete_webhook().await
    }

    async fn poll(&self, offset: Option<i64>) -> Result<Option<Vec<Update>>, BotApiError> {
        self.api.get_updates(offset, self.timeout_secs).await.map(Some)
    }
}

pub struct LongPollRunner {
    source: Arc<dyn UpdateSource>,
    processor: Arc<UpdateProcessor>,
    reconnect_policy: ReconnectPolicy,
}

impl LongPollRunner {
    pub fn new(
        source: Arc<dyn UpdateSource>,
        processor: Arc<UpdateProcessor>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { source, processor, reconnect_policy }
    }

    /// Runs until the source closes or polling fails more than
    /// `max_retries` times in a row.
    pub async fn run(&self) -> Result<(), PollError> {
        self.source.prepare().await.map_err(PollError::Setup)?;
        info!(event_name = "ingress.telegram.polling_started", "long polling started");

        let mut offset: Option<i64> = None;
        let mut failures: u32 = 0;

        loop {
            match self.source.poll(offset).await {
                Ok(None) => {
                    info!(event_name = "ingress.telegram.polling_stopped", "update stream closed");
                    return Ok(());
                }
                Ok(Some(updates)) => {
                    failures = 0;
                    debug!(batch = updates.len(), offset = ?offset, "received update batch");
                    for update in &updates {
                        offset = Some(offset.map_or(update.update_id + 1, |current| {
                            current.max(update.update_id + 1)
                        }));
                        self.processor.process(update).await;
                    }
                }
                Err(BotApiError::RateLimited { retry_after_secs }) => {
                    warn!(retry_after_secs, "bot api rate limited; pausing polling");
                    tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
                }
                Err(error) => {
                    failures += 1;
                    warn!(
                        attempt = failures,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %error,
                        "long polling request failed"
                    );

                    if failures > self.reconnect_policy.max_retries {
                        return Err(PollError::RetriesExhausted {
                            attempts: failures,
                            last_error: error,
                        });
                    }

                    let delay = self.reconnect_policy.backoff(failures - 1);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
