//! HTTP error types.

/// Transport failure talking to a platform API.
///
/// `status` is set when the server answered but the body could not be used.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("HTTP Error: {} at line {} in {}", message, line, file)]
pub struct HttpError {
    /// What went wrong on the wire
    pub message: String,
    /// Status code of the response, if one arrived
    pub status: Option<u16>,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl HttpError {
    /// Create a new HttpError with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use courier_error::HttpError;
    ///
    /// let err = HttpError::new("Connection refused").with_status(502);
    /// assert!(err.message.contains("Connection refused"));
    /// assert_eq!(err.status, Some(502));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            status: None,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Attach the response status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}
