//! Dispatch responses.

use crate::{Job, JobResult};

/// Summary of one task executed by a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum TaskSummary {
    /// A batch of jobs sent to the worker
    #[display("dispatch({} jobs)", _0)]
    Dispatch(usize),
    /// A pause awaited between batches
    #[display("pause")]
    Pause,
    /// A side effect run in sequence
    #[display("thunk")]
    Thunk,
}

/// Successful outcome of one dispatch call.
///
/// `results[i]` belongs to `jobs[i]`; jobs carry the requests as actually
/// sent, after result chaining rewrote them.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct DispatchResponse<T> {
    platform: String,
    target: T,
    jobs: Vec<Job>,
    results: Vec<JobResult>,
    tasks: Vec<TaskSummary>,
}

impl<T> DispatchResponse<T> {
    /// Assemble a response.
    pub fn new(
        platform: impl Into<String>,
        target: T,
        jobs: Vec<Job>,
        results: Vec<JobResult>,
        tasks: Vec<TaskSummary>,
    ) -> Self {
        Self {
            platform: platform.into(),
            target,
            jobs,
            results,
            tasks,
        }
    }

    /// Pairs of job and result in send order.
    pub fn iter(&self) -> impl Iterator<Item = (&Job, &JobResult)> {
        self.jobs.iter().zip(self.results.iter())
    }
}
