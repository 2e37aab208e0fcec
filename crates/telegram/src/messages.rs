use coindash_core::{Reply, ReplyFormat};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    /// Telegram's legacy Markdown dialect: `*bold*`, `_italic_`, `` `code` ``, `[text](url)`.
    Markdown,
}

/// Payload of a `sendMessage` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
}

impl OutgoingMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self { chat_id, text: text.into(), parse_mode: None }
    }

    pub fn parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = Some(parse_mode);
        self
    }

    pub fn from_reply(chat_id: i64, reply: Reply) -> Self {
        let message = Self::new(chat_id, reply.text);
        match reply.format {
            ReplyFormat::Plain => message,
            ReplyFormat::Markdown => message.parse_mode(ParseMode::Markdown),
        }
    }
}
