//! courier - declarative chat-bot content delivered to chat platform APIs.
//!
//! Content is written as a tree of [`Node`]s. A [`Renderer`] flattens the tree
//! into segments, a platform [`JobCompiler`] turns the segments into API jobs,
//! and the [`DispatchEngine`] executes the jobs batch by batch, honoring
//! pauses and feeding the results of earlier jobs into later ones.
//!
//! Multi-turn conversations are written as [`Script`]s. A [`ScriptRuntime`]
//! runs a script until it prompts for input, persists its call stack in a
//! [`StateStore`] and resumes it when the next message arrives.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use courier::{
//!     DispatchEngine, GraphBatchWorker, GraphChat, GraphChatCompiler, JobQueue, Node,
//!     Renderer, graph_components,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let worker = GraphBatchWorker::new("https://graph.facebook.com/v19.0/")
//!         .with_token("PAGE_ID", std::env::var("PAGE_TOKEN")?);
//!     let engine = DispatchEngine::new(
//!         Renderer::new(graph_components()),
//!         JobQueue::new(worker),
//!     );
//!
//!     let target = GraphChat::new("PAGE_ID", "USER_ID");
//!     let response = engine
//!         .dispatch(target, &Node::text("Hello!"), &GraphChatCompiler::default())
//!         .await?;
//!     println!("{:?}", response);
//!     Ok(())
//! }
//! ```
//!
//! # Cargo Features
//!
//! - `graph` - Graph API targets, compilers and batch worker (default)
//! - `telegram` - Telegram Bot API targets, compiler and worker (default)
//!
//! # Architecture
//!
//! courier is organized as a workspace with focused crates:
//!
//! - `courier_error` - Error types
//! - `courier_core` - Content nodes, segments, jobs and responses
//! - `courier_interface` - Dispatch target, job compiler and worker traits
//! - `courier_render` - Segment tree renderer and component registry
//! - `courier_rate_limit` - Configuration, rate limiting and retry
//! - `courier_dispatch` - Dispatch engine, result chaining and middleware
//! - `courier_storage` - Channel-scoped state stores
//! - `courier_script` - Dialogue script builder, interpreter and runtime
//! - `courier_social` - Platform integrations
//!
//! This crate (`courier`) re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

// Re-export core crates (always available)
pub use courier_core::*;
pub use courier_error::*;
pub use courier_interface::*;

pub use courier_dispatch::{
    DispatchEngine, DispatchError, DispatchErrorKind, DispatchFrame, DispatchMiddleware,
    DispatchOutcome, DispatchTask, JobQueue, Next, ResultRegistry, ThrottledWorker, build_tasks,
    split_waves, validate_chaining,
};
pub use courier_rate_limit::{
    CourierConfig, DetectedLimits, DispatchConfig, HeaderRateLimitDetector, MethodTierConfig,
    PlatformConfig, RateLimiter, RateLimiterGuard, RetryPolicy, RetryableError, Tier, TierConfig,
    telegram_retry_after,
};
pub use courier_render::{
    ComponentRegistry, GeneralRenderer, NativeComponent, PlainTextRenderer, ROOT_PATH, Recurse,
    RenderResult, Renderer, assert_kinds, element_path, index_path, render_children,
    render_plain_text, render_text_content, slot_path,
};
pub use courier_script::{
    CallNode, CallStatus, Circumstances, ExecuteContext, ExecuteResult, PromptNode, RunResult,
    STATE_KEY, STATE_VERSION, Script, ScriptCommand, ScriptLibrary, ScriptNode, ScriptProcessor,
    ScriptRuntime, ScriptStateRecord, SerializedFrame, StartOptions, execute,
};
pub use courier_storage::{FileSystemStateStore, InMemoryStateStore, StateStore, updater};

// Platforms (feature-gated)
#[cfg(feature = "graph")]
pub use courier_social::{
    GRAPH_PLATFORM, GraphAttachmentCompiler, GraphBatchWorker, GraphChat, GraphChatCompiler,
    GraphChatOptions, GraphInteractCompiler, GraphPage, GraphPostCompiler, GraphThread,
    InteractResult, graph_components,
};
#[cfg(feature = "telegram")]
pub use courier_social::{
    TELEGRAM_PLATFORM, TelegramChat, TelegramChatCompiler, TelegramChatOptions, TelegramWorker,
    telegram_components,
};
