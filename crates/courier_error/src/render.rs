//! Render error types.

/// Specific error conditions raised while rendering a content tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RenderErrorKind {
    /// A segment kind appeared where its parent does not accept it
    #[display(
        "{} segment rendered by {} at '{}' is not allowed here (expected {})",
        found,
        node,
        path,
        expected
    )]
    InvalidPlacement {
        /// Description of the offending node
        node: String,
        /// Structural path of the offending node
        path: String,
        /// Kinds accepted at this position
        expected: String,
        /// Kind actually rendered
        found: String,
    },
    /// A `part` segment reached the top level of a render
    #[display("part segment rendered by {} at '{}' cannot be sent on its own", node, path)]
    PartAtTopLevel {
        /// Description of the offending node
        node: String,
        /// Structural path of the offending node
        path: String,
    },
    /// No component is registered under the element name
    #[display("unknown {} component <{}> at '{}'", platform, name, path)]
    UnknownComponent {
        /// Platform the element was created for
        platform: String,
        /// Element name
        name: String,
        /// Structural path of the element
        path: String,
    },
    /// A native element was rendered by a renderer for another platform
    #[display(
        "<{}> at '{}' belongs to platform '{}' but is rendered for '{}'",
        name,
        path,
        element_platform,
        renderer_platform
    )]
    PlatformMismatch {
        /// Element name
        name: String,
        /// Structural path of the element
        path: String,
        /// Platform of the element
        element_platform: String,
        /// Platform of the renderer
        renderer_platform: String,
    },
    /// Element props are missing or malformed
    #[display("invalid props for <{}> at '{}': {}", name, path, reason)]
    InvalidProps {
        /// Element name
        name: String,
        /// Structural path of the element
        path: String,
        /// What is wrong with the props
        reason: String,
    },
}

/// Render error with location tracking.
///
/// # Examples
///
/// ```
/// use courier_error::{RenderError, RenderErrorKind};
///
/// let err = RenderError::new(RenderErrorKind::PartAtTopLevel {
///     node: "<button>".to_string(),
///     path: "$[0]".to_string(),
/// });
/// assert!(format!("{}", err).contains("$[0]"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Render Error: {} at line {} in {}", kind, line, file)]
pub struct RenderError {
    /// The specific error condition
    pub kind: RenderErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl RenderError {
    /// Create a new RenderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RenderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
