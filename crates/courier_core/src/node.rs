//! Declarative content tree.

use crate::{Pause, Thunk};
use courier_error::CourierResult;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A node of a declarative content tree.
///
/// Trees are built by the caller and rendered into segments for one
/// platform. Strings, vectors and options convert into nodes so trees read
/// naturally:
///
/// ```
/// use courier_core::Node;
///
/// let tree = Node::fragment(vec![
///     "Hello".into(),
///     Node::Break,
///     Node::text("world"),
///     None::<Node>.into(),
/// ]);
/// assert!(matches!(tree, Node::Fragment(ref children) if children.len() == 4));
/// ```
#[derive(Debug, Clone, Default)]
pub enum Node {
    /// Renders to nothing
    #[default]
    Empty,
    /// Plain text
    Text(String),
    /// Ordered children flattened into the parent
    Fragment(Vec<Node>),
    /// Separator between messages; carries no job
    Break,
    /// Batch boundary with optional delay and callback
    Pause(Pause),
    /// Side effect run at its position in the send sequence
    Thunk(Thunk),
    /// Platform API value passed through untouched
    Raw(JsonValue),
    /// Platform-neutral formatting element
    General(GeneralElement),
    /// Platform-specific component
    Native(NativeElement),
    /// User component expanded before rendering
    Function(FunctionElement),
}

impl Node {
    /// A text node.
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    /// A fragment of children.
    pub fn fragment(children: Vec<Node>) -> Self {
        Node::Fragment(children)
    }

    /// A general formatting element.
    pub fn general(tag: GeneralTag, children: Vec<Node>) -> Self {
        Node::General(GeneralElement { tag, children })
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Node::Empty => "empty".to_string(),
            Node::Text(text) => {
                let preview: String = text.chars().take(16).collect();
                if preview.len() < text.len() {
                    format!("\"{}...\"", preview)
                } else {
                    format!("\"{}\"", preview)
                }
            }
            Node::Fragment(_) => "fragment".to_string(),
            Node::Break => "<Break />".to_string(),
            Node::Pause(_) => "<Pause />".to_string(),
            Node::Thunk(_) => "<Thunk />".to_string(),
            Node::Raw(_) => "<Raw />".to_string(),
            Node::General(element) => format!("<{}>", element.tag),
            Node::Native(element) => format!("<{}>", element.name),
            Node::Function(element) => format!("<{} />", element.name),
        }
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<Vec<Node>> for Node {
    fn from(children: Vec<Node>) -> Self {
        Node::Fragment(children)
    }
}

impl From<Option<Node>> for Node {
    fn from(node: Option<Node>) -> Self {
        node.unwrap_or(Node::Empty)
    }
}

impl From<Pause> for Node {
    fn from(pause: Pause) -> Self {
        Node::Pause(pause)
    }
}

impl From<Thunk> for Node {
    fn from(thunk: Thunk) -> Self {
        Node::Thunk(thunk)
    }
}

/// Formatting tags understood on every platform.
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
pub enum GeneralTag {
    /// Paragraph, followed by a message break
    #[display("p")]
    Paragraph,
    /// Bold text
    #[display("b")]
    Bold,
    /// Italic text
    #[display("i")]
    Italic,
    /// Struck through text
    #[display("s")]
    Strikethrough,
    /// Inline code
    #[display("code")]
    Code,
    /// Line break
    #[display("br")]
    LineBreak,
}

/// A platform-neutral formatting element.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct GeneralElement {
    tag: GeneralTag,
    children: Vec<Node>,
}

/// A platform-specific component reference with props and children.
///
/// # Examples
///
/// ```
/// use courier_core::{NativeElement, Node};
/// use serde_json::json;
///
/// let image = NativeElement::new("telegram", "photo")
///     .with_props(json!({ "url": "https://example.com/cat.png" }))
///     .with_slot("caption", "A cat".into());
///
/// assert_eq!(image.name(), "photo");
/// assert!(image.slots().contains_key("caption"));
/// let _node: Node = image.into();
/// ```
#[derive(Debug, Clone, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct NativeElement {
    #[setters(skip)]
    platform: String,
    #[setters(skip)]
    name: String,
    props: JsonValue,
    children: Vec<Node>,
    #[setters(skip)]
    slots: BTreeMap<String, Node>,
}

impl NativeElement {
    /// An element without props or children.
    pub fn new(platform: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            name: name.into(),
            props: JsonValue::Object(Default::default()),
            children: Vec::new(),
            slots: BTreeMap::new(),
        }
    }

    /// Attach a named child tree.
    pub fn with_slot(mut self, name: impl Into<String>, node: Node) -> Self {
        self.slots.insert(name.into(), node);
        self
    }

    /// Read a string prop.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(JsonValue::as_str)
    }
}

impl From<NativeElement> for Node {
    fn from(element: NativeElement) -> Self {
        Node::Native(element)
    }
}

/// Expansion function of a user component.
pub type ComponentFn = Arc<dyn Fn(&JsonValue) -> CourierResult<Node> + Send + Sync>;

/// A user component: a function from props to a content tree.
#[derive(Clone, derive_getters::Getters)]
pub struct FunctionElement {
    name: String,
    props: JsonValue,
    #[getter(skip)]
    render: ComponentFn,
}

impl FunctionElement {
    /// Wrap a component function.
    pub fn new<F>(name: impl Into<String>, props: JsonValue, render: F) -> Self
    where
        F: Fn(&JsonValue) -> CourierResult<Node> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            props,
            render: Arc::new(render),
        }
    }

    /// Expand the component with its props.
    pub fn expand(&self) -> CourierResult<Node> {
        (self.render)(&self.props)
    }
}

impl std::fmt::Debug for FunctionElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionElement")
            .field("name", &self.name)
            .field("props", &self.props)
            .finish()
    }
}

impl From<FunctionElement> for Node {
    fn from(element: FunctionElement) -> Self {
        Node::Function(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_truncates_long_text() {
        let node = Node::text("a fairly long greeting message");
        assert_eq!(node.describe(), "\"a fairly long gr...\"");
        assert_eq!(Node::text("hi").describe(), "\"hi\"");
    }

    #[test]
    fn test_describe_elements() {
        let native: Node = NativeElement::new("graph", "button").into();
        assert_eq!(native.describe(), "<button>");
        let bold = Node::general(GeneralTag::Bold, vec!["x".into()]);
        assert_eq!(bold.describe(), "<b>");
    }

    #[test]
    fn test_function_element_expands_props() {
        let greet = FunctionElement::new("Greeting", json!({ "name": "Ada" }), |props| {
            let name = props["name"].as_str().unwrap_or("stranger");
            Ok(Node::text(format!("Hello, {}!", name)))
        });
        match greet.expand().unwrap() {
            Node::Text(text) => assert_eq!(text, "Hello, Ada!"),
            other => panic!("unexpected node {:?}", other),
        }
    }
}
