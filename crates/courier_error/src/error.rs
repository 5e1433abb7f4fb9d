//! Top-level error wrapper types.

use crate::{
    ChainingError, CompileError, ConfigError, ExecutionError, HttpError, JsonError, RenderError,
    ScriptError, StateError,
};

/// Every error condition produced by the courier crates.
///
/// # Examples
///
/// ```
/// use courier_error::{CourierError, HttpError};
///
/// let http_err = HttpError::new("Connection failed");
/// let err: CourierError = http_err.into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, Clone, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum CourierErrorKind {
    /// HTTP error
    #[from(HttpError)]
    Http(HttpError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Content tree rendering error
    #[from(RenderError)]
    Render(RenderError),
    /// Job compilation error
    #[from(CompileError)]
    Compile(CompileError),
    /// Result chaining error
    #[from(ChainingError)]
    Chaining(ChainingError),
    /// Job execution error
    #[from(ExecutionError)]
    Execution(ExecutionError),
    /// Script runtime error
    #[from(ScriptError)]
    Script(ScriptError),
    /// State storage error
    #[from(StateError)]
    State(StateError),
}

/// Courier error with kind discrimination.
///
/// # Examples
///
/// ```
/// use courier_error::{CourierError, CourierResult, ConfigError};
///
/// fn might_fail() -> CourierResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Courier Error: {}", _0)]
pub struct CourierError(Box<CourierErrorKind>);

impl CourierError {
    /// Create a new error from a kind.
    pub fn new(kind: CourierErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CourierErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to CourierErrorKind
impl<T> From<T> for CourierError
where
    T: Into<CourierErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for courier operations.
///
/// # Examples
///
/// ```
/// use courier_error::{CourierResult, HttpError};
///
/// fn fetch_data() -> CourierResult<String> {
///     Err(HttpError::new("404 Not Found"))?
/// }
/// ```
pub type CourierResult<T> = std::result::Result<T, CourierError>;
