//! Trait definitions for the courier chat-bot dispatch library.
//!
//! This crate provides the seams the dispatch engine depends on: dispatch
//! targets, per-target job compilers and batch workers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;
mod types;

pub use traits::{DispatchTarget, JobCompiler, Worker};
pub use types::ExecuteOutcome;
