//! Render products.

use crate::{FileAttachment, Pause, Thunk};
use serde_json::Value as JsonValue;

/// The kind of a rendered segment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    derive_more::Display,
    strum::EnumIter,
)]
pub enum SegmentKind {
    /// Plain text
    #[display("text")]
    Text,
    /// Complete platform action
    #[display("unit")]
    Unit,
    /// Fragment embedded into a parent's value
    #[display("part")]
    Part,
    /// Platform value passed through untouched
    #[display("raw")]
    Raw,
    /// Message separator
    #[display("break")]
    Break,
    /// Batch boundary
    #[display("pause")]
    Pause,
    /// In-sequence side effect
    #[display("thunk")]
    Thunk,
}

/// A complete platform action produced by a native component.
///
/// # Examples
///
/// ```
/// use courier_core::UnitValue;
/// use serde_json::json;
///
/// let unit = UnitValue::new(json!({ "type": "photo", "url": "https://x.test/a.png" }));
/// assert_eq!(unit.value_type(), Some("photo"));
/// assert!(unit.file().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct UnitValue {
    payload: JsonValue,
    file: Option<FileAttachment>,
}

impl UnitValue {
    /// A unit without upload payload.
    pub fn new(payload: JsonValue) -> Self {
        Self {
            payload,
            file: None,
        }
    }

    /// Attach a binary upload to the unit.
    pub fn with_file(mut self, file: FileAttachment) -> Self {
        self.file = Some(file);
        self
    }

    /// The `type` field of the payload, used by compilers to pick an endpoint.
    pub fn value_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(JsonValue::as_str)
    }
}

/// Kind-dependent payload of a segment.
#[derive(Debug, Clone)]
pub enum SegmentValue {
    /// Plain text
    Text(String),
    /// Complete platform action
    Unit(UnitValue),
    /// Fragment to be embedded into a parent's value
    Part(JsonValue),
    /// Untouched platform value
    Raw(JsonValue),
    /// Message separator
    Break,
    /// Batch boundary
    Pause(Pause),
    /// In-sequence side effect
    Thunk(Thunk),
}

/// One unit of rendered output.
///
/// `node` describes the originating tree node and `path` its structural
/// position; both only serve diagnostics.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct Segment {
    value: SegmentValue,
    node: String,
    path: String,
}

impl Segment {
    /// Create a segment.
    pub fn new(value: SegmentValue, node: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            value,
            node: node.into(),
            path: path.into(),
        }
    }

    /// A text segment.
    pub fn text(text: impl Into<String>, node: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(SegmentValue::Text(text.into()), node, path)
    }

    /// A unit segment.
    pub fn unit(unit: UnitValue, node: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(SegmentValue::Unit(unit), node, path)
    }

    /// A part segment.
    pub fn part(value: JsonValue, node: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(SegmentValue::Part(value), node, path)
    }

    /// A break segment.
    pub fn break_(node: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(SegmentValue::Break, node, path)
    }

    /// Kind of the segment.
    pub fn kind(&self) -> SegmentKind {
        match &self.value {
            SegmentValue::Text(_) => SegmentKind::Text,
            SegmentValue::Unit(_) => SegmentKind::Unit,
            SegmentValue::Part(_) => SegmentKind::Part,
            SegmentValue::Raw(_) => SegmentKind::Raw,
            SegmentValue::Break => SegmentKind::Break,
            SegmentValue::Pause(_) => SegmentKind::Pause,
            SegmentValue::Thunk(_) => SegmentKind::Thunk,
        }
    }

    /// Consume the segment, keeping its value.
    pub fn into_value(self) -> SegmentValue {
        self.value
    }

    /// Text content, when the segment is text.
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            SegmentValue::Text(text) => Some(text),
            _ => None,
        }
    }
}
