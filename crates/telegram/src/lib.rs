//! Telegram integration - Bot API transport for the leaderboard bot
//!
//! - **Bot API** (`api`) - typed updates and an HTTP client for the methods the bot uses
//! - **Commands** (`commands`) - `/start`, `/help`, `/leaderboard` parsing and routing
//! - **Events** (`events`) - routes updates to handlers by kind
//! - **Messages** (`messages`) - outgoing `sendMessage` payloads
//! - **Polling** (`polling`) - `getUpdates` long-poll loop with backoff
//! - **Processor** (`processor`) - dispatch + reply delivery shared by polling and webhook delivery
//!
//! # Architecture
//!
//! ```text
//! getUpdates / webhook → UpdateProcessor → UpdateDispatcher → CommandRouter → BotCommandService
//!                              ↓
//!                        sendMessage ← Reply
//! ```

pub mod api;
pub mod commands;
pub mod events;
pub mod messages;
pub mod polling;
pub mod processor;
