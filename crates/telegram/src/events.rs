use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::{
    api::Update,
    commands::{BotCommandService, CommandContext, CommandParser, CommandRouteError, CommandRouter},
    messages::OutgoingMessage,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Message,
    Unsupported,
}

impl UpdateKind {
    pub fn of(update: &Update) -> Self {
        if update.message.is_some() {
            Self::Message
        } else {
            Self::Unsupported
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl EventContext {
    pub fn for_update(update: &Update) -> Self {
        Self { correlation_id: format!("update-{}", update.update_id) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(OutgoingMessage),
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn kind(&self) -> UpdateKind;
    async fn handle(
        &self,
        update: &Update,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

/// Routes each update to the single handler registered for its kind.
/// Kinds without a handler are ignored.
#[derive(Default)]
pub struct UpdateDispatcher {
    handlers: HashMap<UpdateKind, Arc<dyn EventHandler>>,
}

impl UpdateDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.kind(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        update: &Update,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&UpdateKind::of(update)) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(update, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub fn command_dispatcher<S>(service: S, parser: CommandParser) -> UpdateDispatcher
where
    S: BotCommandService + 'static,
{
    let mut dispatcher = UpdateDispatcher::new();
    dispatcher.register(CommandMessageHandler::new(service, parser));
    dispatcher
}

pub struct CommandMessageHandler<S> {
    router: CommandRouter<S>,
    parser: CommandParser,
}

impl<S> CommandMessageHandler<S>
where
    S: BotCommandService,
{
    pub fn new(service: S, parser: CommandParser) -> Self {
        Self { router: CommandRouter::new(service), parser }
    }
}

#[async_trait]
impl<S> EventHandler for CommandMessageHandler<S>
where
    S: BotCommandService + 'static,
{
    fn kind(&self) -> UpdateKind {
        UpdateKind::Message
    }

    async fn handle(
        &self,
        update: &Update,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let Some(message) = &update.message else {
            return Ok(HandlerResult::Ignored);
        };
        let Some(command) = message.text.as_deref().and_then(|text| self.parser.parse(text))
        else {
            return Ok(HandlerResult::Ignored);
        };

        debug!(
            event_name = "ingress.telegram.command_parsed",
            correlation_id = %ctx.correlation_id,
            command = command.name(),
            chat_id = message.chat.id,
            "parsed bot command"
        );

        let command_ctx = CommandContext {
            chat_id: message.chat.id,
            user_id: message.from.as_ref().map(|user| user.id),
            message_id: message.message_id,
            correlation_id: ctx.correlation_id.clone(),
        };

        match self.router.route(&command, &command_ctx).await? {
            Some(reply) => {
                Ok(HandlerResult::Responded(OutgoingMessage::from_reply(message.chat.id, reply)))
            }
            None => Ok(HandlerResult::Ignored),
        }
    }
}
