//! Platform integrations for courier.
//!
//! Each platform contributes three things: dispatch targets, job compilers
//! that turn rendered segments into platform requests, and a worker that
//! executes those requests over HTTP. Native components for the platform are
//! registered into a [`courier_render::ComponentRegistry`].
//!
//! # Platform Support
//!
//! Each platform is feature-gated and lives in its own submodule:
//! - `graph` - Messenger chat, page posts, comment threads and attachment
//!   uploads through the Graph API batch endpoint (requires `graph` feature)
//! - `telegram` - Telegram Bot API chats (requires `telegram` feature)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod common;

#[cfg(feature = "graph")]
mod graph;

#[cfg(feature = "telegram")]
mod telegram;

#[cfg(feature = "graph")]
pub use graph::{
    GRAPH_PLATFORM, GraphAttachmentCompiler, GraphBatchWorker, GraphChat, GraphChatCompiler,
    GraphChatOptions, GraphInteractCompiler, GraphPage, GraphPostCompiler, GraphThread,
    InteractResult, build_batch, graph_components, parse_batch_response,
};

#[cfg(feature = "telegram")]
pub use telegram::{
    TELEGRAM_PLATFORM, TelegramChat, TelegramChatCompiler, TelegramChatOptions, TelegramWorker,
    parse_telegram_response, telegram_components,
};
