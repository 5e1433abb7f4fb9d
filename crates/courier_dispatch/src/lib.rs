//! Dispatch engine for the courier chat-bot dispatch library.
//!
//! A dispatch renders a content tree, splits the segments at pauses and
//! thunks, compiles each batch into jobs for the target and executes the
//! tasks strictly in order:
//!
//! - jobs consuming earlier results are rewritten just before they are sent
//! - batches are split to the configured maximum size
//! - batches sharing an ordering key never interleave ([`JobQueue`])
//! - the first failure stops the dispatch and reports partial results
//!
//! Middlewares ([`DispatchMiddleware`]) wrap execution and may short-circuit
//! it or transform its response.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chaining;
mod engine;
mod error;
mod middleware;
mod queue;
mod task;
mod throttle;

pub use chaining::{ResultRegistry, split_waves, validate_chaining};
pub use engine::DispatchEngine;
pub use error::{DispatchError, DispatchErrorKind};
pub(crate) use middleware::FrameExecutor;
pub use middleware::{DispatchFrame, DispatchMiddleware, DispatchOutcome, Next};
pub use queue::JobQueue;
pub use task::{DispatchTask, build_tasks};
pub use throttle::ThrottledWorker;
