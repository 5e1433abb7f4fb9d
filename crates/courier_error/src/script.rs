//! Script runtime error types.

/// Specific error conditions raised while building or running scripts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ScriptErrorKind {
    /// A label is missing from the compiled script
    #[display("label '{}' not found in script '{}'", label, script)]
    LabelNotFound {
        /// Script name
        script: String,
        /// Missing label
        label: String,
    },
    /// The command at a stop point is not of the expected type
    #[display(
        "stopped point '{}' in script '{}' is a {} command, expected {}",
        label,
        script,
        found,
        expected
    )]
    UnexpectedCommand {
        /// Script name
        script: String,
        /// Label of the stop point
        label: String,
        /// Expected command type
        expected: String,
        /// Actual command type
        found: String,
    },
    /// A label, prompt key or call key is used twice
    #[display("duplicated key '{}' in script '{}'", key, script)]
    DuplicateKey {
        /// Script name
        script: String,
        /// Repeated key
        key: String,
    },
    /// A jump leaves the command range
    #[display("jump to index {} is out of range in script '{}'", index, script)]
    JumpOutOfRange {
        /// Script name
        script: String,
        /// Computed target index
        index: isize,
    },
    /// No script with this name is in the library
    #[display("script '{}' is not in the library", _0)]
    UnknownScript(String),
    /// Two scripts in one library share a name
    #[display("script name '{}' is registered more than once", _0)]
    DuplicateScript(String),
    /// The call stack is empty where a frame is required
    #[display("call stack is empty")]
    EmptyStack,
    /// The runtime has already finished
    #[display("runtime of channel '{}' is already finished", _0)]
    AlreadyFinished(String),
    /// The persisted record cannot be understood
    #[display("invalid persisted state for channel '{}': {}", channel, reason)]
    InvalidState {
        /// Channel the state belongs to
        channel: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Script error with location tracking.
///
/// # Examples
///
/// ```
/// use courier_error::{ScriptError, ScriptErrorKind};
///
/// let err = ScriptError::new(ScriptErrorKind::LabelNotFound {
///     script: "greeting".to_string(),
///     label: "ASK".to_string(),
/// });
/// assert!(format!("{}", err).contains("greeting"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Script Error: {} at line {} in {}", kind, line, file)]
pub struct ScriptError {
    /// The specific error condition
    pub kind: ScriptErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ScriptError {
    /// Create a new ScriptError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ScriptErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
