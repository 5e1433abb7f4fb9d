//! Job execution error types.

/// Specific error conditions raised by a worker while executing jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ExecutionErrorKind {
    /// The platform API answered with an error for one job
    #[display("API error {} for {}: {}", code, url, message)]
    Api {
        /// Status or platform error code
        code: u16,
        /// Relative URL or method of the failed job
        url: String,
        /// Message returned by the platform
        message: String,
    },
    /// The platform rate limited the request
    #[display("rate limited on {}: retry after {} seconds", url, retry_after)]
    RateLimited {
        /// Relative URL or method of the failed job
        url: String,
        /// Seconds to wait before retrying
        retry_after: u64,
    },
    /// The request never reached the platform or the response was unreadable
    #[display("transport failure: {}", _0)]
    Transport(String),
    /// The job was not attempted because an earlier job failed
    #[display("job {} skipped after an earlier failure", _0)]
    Skipped(usize),
}

/// Error for a single failed job or batch transport, with location tracking.
///
/// # Examples
///
/// ```
/// use courier_error::{ExecutionError, ExecutionErrorKind};
///
/// let err = ExecutionError::new(ExecutionErrorKind::Transport("timeout".to_string()));
/// assert!(err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Execution Error: {} at line {} in {}", kind, line, file)]
pub struct ExecutionError {
    /// The specific error condition
    pub kind: ExecutionErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ExecutionError {
    /// Create a new ExecutionError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ExecutionErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            ExecutionErrorKind::Api { code, .. } => matches!(code, 500 | 502 | 503 | 504),
            ExecutionErrorKind::RateLimited { .. } | ExecutionErrorKind::Transport(_) => true,
            ExecutionErrorKind::Skipped(_) => false,
        }
    }

    /// Wait requested by the platform before this request may be retried.
    ///
    /// ```
    /// use courier_error::{ExecutionError, ExecutionErrorKind};
    /// use std::time::Duration;
    ///
    /// let err = ExecutionError::new(ExecutionErrorKind::RateLimited {
    ///     url: "sendMessage".to_string(),
    ///     retry_after: 3,
    /// });
    /// assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
    /// ```
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match &self.kind {
            ExecutionErrorKind::RateLimited { retry_after, .. } => {
                Some(std::time::Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }
}
