//! Core data types for the courier chat-bot dispatch library.
//!
//! This crate provides the content tree, render segments, compiled jobs and
//! dispatch responses shared by every courier crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod job;
mod node;
mod path;
mod pause;
mod response;
mod segment;
mod telemetry;

pub use job::{
    AccomplishRequest, ConsumeResult, FileAttachment, Job, JobResult, Request, ResultLookup,
};
pub use node::{ComponentFn, FunctionElement, GeneralElement, GeneralTag, NativeElement, Node};
pub use path::lookup_path;
pub use pause::{Pause, PauseAfter, Thunk, ThunkEffect};
pub use response::{DispatchResponse, TaskSummary};
pub use segment::{Segment, SegmentKind, SegmentValue, UnitValue};
pub use telemetry::{init_telemetry, shutdown_telemetry};
