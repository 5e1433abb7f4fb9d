//! Dispatch error type.

use courier_core::{Job, JobResult};
use courier_error::{CourierError, ExecutionError};

/// What went wrong during a dispatch.
#[derive(Debug, Clone, derive_more::Display)]
pub enum DispatchErrorKind {
    /// Rendering, compiling or validating the content failed before any send
    #[display("failed to prepare dispatch: {}", _0)]
    Prepare(CourierError),
    /// The worker reported failed jobs
    #[display("{} of {} jobs failed", failed, total)]
    Execution {
        /// Number of failed jobs
        failed: usize,
        /// Number of jobs in the dispatch
        total: usize,
    },
    /// Resolving consumed results failed
    #[display("result chaining failed: {}", _0)]
    Chaining(CourierError),
    /// A pause callback failed
    #[display("pause failed: {}", _0)]
    Pause(CourierError),
    /// A thunk effect failed
    #[display("thunk failed: {}", _0)]
    Thunk(CourierError),
    /// A middleware rejected the dispatch
    #[display("middleware failed: {}", _0)]
    Middleware(String),
}

/// Failure of a dispatch, with enough context to recover partial work.
///
/// `jobs` lists every job of the dispatch in send order and `results` has one
/// slot per job: `Some` for jobs known to have succeeded, `None` otherwise.
///
/// # Examples
///
/// ```
/// use courier_dispatch::{DispatchError, DispatchErrorKind};
///
/// let err = DispatchError::new(DispatchErrorKind::Middleware("blocked".to_string()));
/// assert!(err.to_string().contains("blocked"));
/// assert_eq!(err.succeeded().count(), 0);
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Dispatch Error: {} at line {} in {}", kind, line, file)]
pub struct DispatchError {
    /// The specific error condition
    pub kind: DispatchErrorKind,
    /// Underlying execution errors
    pub errors: Vec<ExecutionError>,
    /// Every job of the dispatch
    pub jobs: Vec<Job>,
    /// One slot per job, `None` where the result is unknown
    pub results: Vec<Option<JobResult>>,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl DispatchError {
    /// Create a new DispatchError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: DispatchErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            errors: Vec::new(),
            jobs: Vec::new(),
            results: Vec::new(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// Error raised before anything was sent.
    #[track_caller]
    pub fn prepare(error: impl Into<CourierError>) -> Self {
        Self::new(DispatchErrorKind::Prepare(error.into()))
    }

    /// Attach the dispatch's jobs and their known results.
    pub fn with_jobs(mut self, jobs: Vec<Job>, results: Vec<Option<JobResult>>) -> Self {
        self.jobs = jobs;
        self.results = results;
        self
    }

    /// Attach underlying execution errors.
    pub fn with_errors(mut self, errors: Vec<ExecutionError>) -> Self {
        self.errors = errors;
        self
    }

    /// Jobs that completed, paired with their results.
    pub fn succeeded(&self) -> impl Iterator<Item = (&Job, &JobResult)> {
        self.jobs
            .iter()
            .zip(self.results.iter())
            .filter_map(|(job, result)| result.as_ref().map(|r| (job, r)))
    }

    /// Whether anything was delivered before the failure.
    pub fn is_partial(&self) -> bool {
        self.results.iter().any(Option::is_some)
    }
}
