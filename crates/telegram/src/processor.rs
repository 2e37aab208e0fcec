use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    api::{BotApi, Update},
    events::{EventContext, HandlerResult, UpdateDispatcher, UpdateKind},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    Replied,
    Ignored,
    Failed(String),
}

/// Turns one incoming update into at most one outgoing message.
/// Shared by long polling and the webhook endpoint.
pub struct UpdateProcessor {
    dispatcher: UpdateDispatcher,
    api: Arc<dyn BotApi>,
}

impl UpdateProcessor {
    pub fn new(dispatcher: UpdateDispatcher, api: Arc<dyn BotApi>) -> Self {
        Self { dispatcher, api }
    }

    pub async fn process(&self, update: &Update) -> ProcessOutcome {
        let ctx = EventContext::for_update(update);
        let kind = UpdateKind::of(update);
        debug!(
            event_name = "ingress.telegram.update_received",
            correlation_id = %ctx.correlation_id,
            update_kind = kind.as_str(),
            "received telegram update"
        );

        let result = match self.dispatcher.dispatch(update, &ctx).await {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    event_name = "ingress.telegram.dispatch_failed",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "update dispatch failed; continuing"
                );
                return ProcessOutcome::Failed(error.to_string());
            }
        };

        match result {
            HandlerResult::Responded(message) => {
                match self.api.send_message(&message).await {
                    Ok(()) => {
                        info!(
                            event_name = "egress.telegram.reply_sent",
                            correlation_id = %ctx.correlation_id,
                            chat_id = message.chat_id,
                            "sent reply"
                        );
                        ProcessOutcome::Replied
                    }
                    Err(error) => {
                        warn!(
                            event_name = "egress.telegram.reply_failed",
                            correlation_id = %ctx.correlation_id,
                            chat_id = message.chat_id,
                            error = %error,
                            "failed to send reply"
                        );
                        ProcessOutcome::Failed(error.to_string())
                    }
                }
            }
            HandlerResult::Ignored => ProcessOutcome::Ignored,
        }
    }
}
