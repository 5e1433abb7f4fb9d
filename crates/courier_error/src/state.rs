//! State storage error types.

/// Kinds of state storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StateErrorKind {
    /// Another runtime changed or owns the state
    #[display("state of channel '{}' is already being processed by another runtime", _0)]
    Conflict(String),
    /// Failed to create the storage directory
    #[display("Failed to create state directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to read stored state
    #[display("Failed to read state: {}", _0)]
    Read(String),
    /// Failed to write stored state
    #[display("Failed to write state: {}", _0)]
    Write(String),
    /// Stored state is not valid JSON
    #[display("Corrupted state: {}", _0)]
    Corrupted(String),
}

/// State storage error with location tracking.
///
/// # Examples
///
/// ```
/// use courier_error::{StateError, StateErrorKind};
///
/// let err = StateError::new(StateErrorKind::Conflict("telegram.42".to_string()));
/// assert!(err.is_conflict());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("State Error: {} at line {} in {}", kind, line, file)]
pub struct StateError {
    /// The kind of error that occurred
    pub kind: StateErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StateError {
    /// Create a new state error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StateErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether this error reports a concurrent modification.
    pub fn is_conflict(&self) -> bool {
        matches!(self.kind, StateErrorKind::Conflict(_))
    }
}
