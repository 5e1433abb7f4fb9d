//! Component resolution for native and general elements.

use courier_core::{GeneralElement, GeneralTag, NativeElement, Node, Segment};
use courier_error::CourierResult;
use std::collections::HashMap;
use std::sync::Arc;

use crate::render_text_content;

/// Result of rendering one node.
///
/// `None` means the node rendered to nothing.
pub type RenderResult = CourierResult<Option<Vec<Segment>>>;

/// Renders a child tree at the given path.
pub type Recurse<'a> = &'a dyn Fn(&Node, &str) -> RenderResult;

/// Render function of a platform-native component.
///
/// Implementations shape their props into a platform value and may render
/// their children or named slots through `recurse` to embed child values.
/// Rendering must be free of side effects.
pub trait NativeComponent: Send + Sync {
    /// Element name the component is registered under.
    fn name(&self) -> &str;

    /// Render an element of this component; `path` is the element's own path.
    fn render(&self, element: &NativeElement, path: &str, recurse: Recurse<'_>) -> RenderResult;
}

/// Renders platform-neutral formatting elements for one platform.
pub trait GeneralRenderer: Send + Sync {
    /// Render a general element whose own path is `path`.
    fn render(&self, element: &GeneralElement, path: &str, recurse: Recurse<'_>) -> RenderResult;
}

/// Renders formatting as plain text.
///
/// Inline tags keep only their text, a paragraph ends with a message break
/// and a line break becomes a break segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl GeneralRenderer for PlainTextRenderer {
    fn render(&self, element: &GeneralElement, path: &str, recurse: Recurse<'_>) -> RenderResult {
        let node = format!("<{}>", element.tag());

        if *element.tag() == GeneralTag::LineBreak {
            return Ok(Some(vec![Segment::break_(node, path)]));
        }

        let Some(text) = render_text_content(recurse, element.children(), &node, path)? else {
            return Ok(None);
        };

        let mut segments = vec![Segment::text(text, node.clone(), path)];
        if *element.tag() == GeneralTag::Paragraph {
            segments.push(Segment::break_(node, path));
        }
        Ok(Some(segments))
    }
}

/// Resolves native components of one platform by element name.
///
/// # Examples
///
/// ```
/// use courier_render::ComponentRegistry;
///
/// let registry = ComponentRegistry::new("telegram");
/// assert_eq!(registry.platform(), "telegram");
/// assert!(registry.get("photo").is_none());
/// ```
#[derive(Clone)]
pub struct ComponentRegistry {
    platform: String,
    components: HashMap<String, Arc<dyn NativeComponent>>,
    general: Arc<dyn GeneralRenderer>,
}

impl ComponentRegistry {
    /// Create an empty registry rendering general elements as plain text.
    pub fn new(platform: impl Into<String>) -> Self {
        let platform = platform.into();
        tracing::debug!(platform = %platform, "Creating new ComponentRegistry");
        Self {
            platform,
            components: HashMap::new(),
            general: Arc::new(PlainTextRenderer),
        }
    }

    /// Register a native component.
    pub fn register<C: NativeComponent + 'static>(&mut self, component: C) -> &mut Self {
        tracing::debug!(
            platform = %self.platform,
            component = component.name(),
            "Registering native component"
        );
        self.components
            .insert(component.name().to_string(), Arc::new(component));
        self
    }

    /// Replace the general element renderer.
    pub fn with_general<G: GeneralRenderer + 'static>(mut self, general: G) -> Self {
        self.general = Arc::new(general);
        self
    }

    /// Platform this registry serves.
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Get a component by element name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn NativeComponent>> {
        self.components.get(name)
    }

    /// Renderer for general elements.
    pub fn general(&self) -> &Arc<dyn GeneralRenderer> {
        &self.general
    }

    /// Registered component names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.components.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("platform", &self.platform)
            .field("components", &self.names())
            .finish()
    }
}
