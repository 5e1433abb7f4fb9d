//! Result chaining error types.

/// Specific error conditions raised while resolving chained job results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ChainingErrorKind {
    /// A job consumes a key no earlier job registered
    #[display("result key '{}' is not registered by any earlier job", _0)]
    UnregisteredKey(String),
    /// Two jobs in one dispatch register the same key
    #[display("result key '{}' is registered more than once", _0)]
    DuplicateKey(String),
    /// The path expression is malformed
    #[display("invalid result path '{}': {}", path, reason)]
    InvalidPath {
        /// The path expression
        path: String,
        /// What is wrong with it
        reason: String,
    },
    /// The path does not resolve inside the registered result
    #[display("path '{}' not found in result '{}'", path, key)]
    PathNotFound {
        /// Registration key
        key: String,
        /// The path expression
        path: String,
    },
    /// The request rewrite function failed
    #[display("failed to accomplish request: {}", _0)]
    Accomplish(String),
}

/// Result chaining error with location tracking.
///
/// # Examples
///
/// ```
/// use courier_error::{ChainingError, ChainingErrorKind};
///
/// let err = ChainingError::new(ChainingErrorKind::UnregisteredKey("photo_0".to_string()));
/// assert!(format!("{}", err).contains("photo_0"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Chaining Error: {} at line {} in {}", kind, line, file)]
pub struct ChainingError {
    /// The specific error condition
    pub kind: ChainingErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ChainingError {
    /// Create a new ChainingError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ChainingErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
