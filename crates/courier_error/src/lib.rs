//! Error types for the courier library.
//!
//! This crate provides the foundation error types used throughout the courier crates.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use courier_error::{CourierResult, RenderError, RenderErrorKind};
//!
//! fn render() -> CourierResult<()> {
//!     Err(RenderError::new(RenderErrorKind::PartAtTopLevel {
//!         node: "<button>".to_string(),
//!         path: "$".to_string(),
//!     }))?
//! }
//!
//! assert!(render().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chaining;
mod compile;
mod config;
mod error;
mod execution;
mod http;
mod json;
mod render;
mod script;
mod state;

pub use chaining::{ChainingError, ChainingErrorKind};
pub use compile::{CompileError, CompileErrorKind};
pub use config::ConfigError;
pub use error::{CourierError, CourierErrorKind, CourierResult};
pub use execution::{ExecutionError, ExecutionErrorKind};
pub use http::HttpError;
pub use json::JsonError;
pub use render::{RenderError, RenderErrorKind};
pub use script::{ScriptError, ScriptErrorKind};
pub use state::{StateError, StateErrorKind};
