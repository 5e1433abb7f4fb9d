//! Seams between rendering, compilation and execution.

use crate::ExecuteOutcome;
use async_trait::async_trait;
use courier_core::{Job, Segment};
use courier_error::CourierResult;

/// The logical destination of a dispatch (a chat, a page feed, a comment thread).
///
/// The target type selects the job compiler used for it.
pub trait DispatchTarget: Send + Sync {
    /// Platform the target lives on.
    fn platform(&self) -> &str;

    /// Stable identifier of the destination, used for logging and ordering keys.
    fn uid(&self) -> String;

    /// Whether pause elements may appear in content sent to this target.
    fn allow_pause(&self) -> bool {
        true
    }
}

/// Turns one pause-delimited batch of segments into jobs for a target type.
///
/// Compilers are invoked once per batch of a single dispatch; state such as
/// single-use options is kept inside the compiler instance.
pub trait JobCompiler<T: DispatchTarget>: Send + Sync {
    /// Compile segments into ordered jobs.
    ///
    /// # Errors
    ///
    /// Returns a compile error when a segment is invalid for the target or the
    /// number of segments is not accepted.
    fn compile(&self, target: &T, segments: Vec<Segment>) -> CourierResult<Vec<Job>>;
}

/// Physically executes a batch of jobs against a platform API.
///
/// Whether the batch is one multi-call request or N requests is the worker's
/// concern. Results are returned in submission order.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Execute all jobs of one batch.
    async fn execute_jobs(&self, jobs: &[Job]) -> ExecuteOutcome;
}
