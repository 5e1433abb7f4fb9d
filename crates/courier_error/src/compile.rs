//! Job compilation error types.

/// Specific error conditions raised while compiling segments into jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum CompileErrorKind {
    /// The segment kind or value is not accepted by this target
    #[display("{} at '{}' is invalid for {}: {}", node, path, target, reason)]
    InvalidSegment {
        /// Description of the offending node
        node: String,
        /// Structural path of the offending node
        path: String,
        /// Target type being compiled for
        target: String,
        /// Why the segment was rejected
        reason: String,
    },
    /// Wrong number of segments for this target
    #[display("{} accepts {} but received {} segments", target, expected, found)]
    Arity {
        /// Target type being compiled for
        target: String,
        /// Human readable description of the accepted count
        expected: String,
        /// Number of segments received
        found: usize,
    },
    /// A single-use option was consumed more than once
    #[display("{} can only be used to send one message", option)]
    SingleUseOption {
        /// Name of the option
        option: String,
    },
}

/// Job compilation error with location tracking.
///
/// # Examples
///
/// ```
/// use courier_error::{CompileError, CompileErrorKind};
///
/// let err = CompileError::new(CompileErrorKind::Arity {
///     target: "attachment upload".to_string(),
///     expected: "exactly 1".to_string(),
///     found: 2,
/// });
/// assert!(format!("{}", err).contains("exactly 1"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Compile Error: {} at line {} in {}", kind, line, file)]
pub struct CompileError {
    /// The specific error condition
    pub kind: CompileErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl CompileError {
    /// Create a new CompileError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CompileErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
