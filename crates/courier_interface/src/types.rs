//! Execution outcome types.

use courier_core::JobResult;
use courier_error::ExecutionError;
use std::time::Duration;

/// Result of executing one batch of jobs.
///
/// # Examples
///
/// ```
/// use courier_core::JobResult;
/// use courier_error::{ExecutionError, ExecutionErrorKind};
/// use courier_interface::ExecuteOutcome;
/// use serde_json::json;
///
/// let outcome = ExecuteOutcome::Failure {
///     errors: vec![ExecutionError::new(ExecutionErrorKind::Transport("reset".into()))],
///     results: vec![Some(JobResult::ok(json!({ "id": "1" }))), None],
/// };
/// assert!(!outcome.is_success());
/// assert_eq!(outcome.partial_results().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub enum ExecuteOutcome {
    /// Every job succeeded; one result per job
    Success(Vec<JobResult>),
    /// At least one job failed
    Failure {
        /// Underlying errors
        errors: Vec<ExecutionError>,
        /// One slot per job, `None` where the result is unknown
        results: Vec<Option<JobResult>>,
    },
}

impl ExecuteOutcome {
    /// Whether all jobs succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecuteOutcome::Success(_))
    }

    /// Per-job results, with `None` for failed or unknown jobs.
    pub fn partial_results(&self) -> Vec<Option<JobResult>> {
        match self {
            ExecuteOutcome::Success(results) => results.iter().cloned().map(Some).collect(),
            ExecuteOutcome::Failure { results, .. } => results.clone(),
        }
    }

    /// Whether the failure is worth retrying as a whole.
    ///
    /// True only when nothing succeeded and every error is retryable. A batch
    /// with any delivered job is never resent.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExecuteOutcome::Success(_) => false,
            ExecuteOutcome::Failure { errors, results } => {
                !errors.is_empty()
                    && results.iter().all(Option::is_none)
                    && errors.iter().all(|e| e.is_retryable())
            }
        }
    }

    /// Longest wait any failed job was asked to observe before a retry.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ExecuteOutcome::Success(_) => None,
            ExecuteOutcome::Failure { errors, .. } => {
                errors.iter().filter_map(ExecutionError::retry_after).max()
            }
        }
    }
}
