//! Telegram Bot API integration.
//!
//! A [`TelegramChat`] is addressed by the bot that talks in it; jobs name the
//! Bot API method as their URL and [`TelegramWorker`] calls the methods one
//! by one.

mod chat;
mod components;
mod worker;

/// Platform name of Telegram targets and components.
pub const TELEGRAM_PLATFORM: &str = "telegram";

pub use chat::{TelegramChat, TelegramChatCompiler, TelegramChatOptions};
pub use components::telegram_components;
pub use worker::{TelegramWorker, parse_telegram_response};
