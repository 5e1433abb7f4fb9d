//! Graph API integration.
//!
//! Targets:
//! - [`GraphChat`]: a Messenger conversation between a page and a user
//! - [`GraphPage`]: a page feed, and the page's attachment uploads
//! - [`GraphThread`]: the comment thread under a post or photo
//!
//! Jobs run under the page as channel; [`GraphBatchWorker`] looks up the page
//! access token and sends each execution as one batch request.

mod attachment;
mod chat;
mod components;
mod interact;
mod post;
mod target;
mod worker;

/// Platform name of Graph API targets and components.
pub const GRAPH_PLATFORM: &str = "graph";

pub use attachment::GraphAttachmentCompiler;
pub use chat::{GraphChatCompiler, GraphChatOptions};
pub use components::graph_components;
pub use interact::{GraphInteractCompiler, InteractResult};
pub use post::GraphPostCompiler;
pub use target::{GraphChat, GraphPage, GraphThread};
pub use worker::{GraphBatchWorker, build_batch, parse_batch_response};
