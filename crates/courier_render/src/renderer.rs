//! Segment tree renderer.

use crate::{ComponentRegistry, RenderResult, element_path, index_path};
use courier_core::{Node, Segment, SegmentKind, SegmentValue};
use courier_error::{CourierResult, RenderError, RenderErrorKind};
use tracing::{debug, instrument};

/// Root path of every render.
pub const ROOT_PATH: &str = "$";

/// Renders content trees into ordered segments for one platform.
///
/// # Examples
///
/// ```
/// use courier_core::{GeneralTag, Node};
/// use courier_render::{ComponentRegistry, Renderer};
///
/// let renderer = Renderer::new(ComponentRegistry::new("telegram"));
/// let tree = Node::fragment(vec![
///     Node::general(GeneralTag::Paragraph, vec!["Hello".into()]),
///     "World".into(),
/// ]);
///
/// let segments = renderer.render(&tree).unwrap().unwrap();
/// assert_eq!(segments.len(), 3);
/// assert_eq!(segments[2].as_text(), Some("World"));
///
/// assert!(renderer.render(&Node::Empty).unwrap().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Renderer {
    registry: ComponentRegistry,
}

impl Renderer {
    /// Create a renderer for the registry's platform.
    pub fn new(registry: ComponentRegistry) -> Self {
        Self { registry }
    }

    /// Platform the renderer produces segments for.
    pub fn platform(&self) -> &str {
        self.registry.platform()
    }

    /// Render a tree into a flat segment list.
    ///
    /// Returns `None` when the tree renders to nothing.
    ///
    /// # Errors
    ///
    /// Returns a render error naming the offending node and path when an
    /// element is misplaced, unknown or belongs to another platform, or when a
    /// `part` segment reaches the top level.
    #[instrument(
        skip(self, node),
        fields(platform = %self.registry.platform(), node = %node.describe())
    )]
    pub fn render(&self, node: &Node) -> RenderResult {
        let Some(segments) = self.render_node(node, ROOT_PATH)? else {
            debug!("Tree rendered to nothing");
            return Ok(None);
        };

        if let Some(part) = segments.iter().find(|s| s.kind() == SegmentKind::Part) {
            return Err(RenderError::new(RenderErrorKind::PartAtTopLevel {
                node: part.node().clone(),
                path: part.path().clone(),
            })
            .into());
        }

        debug!(segments = segments.len(), "Rendered tree");
        Ok(Some(segments))
    }

    fn render_node(&self, node: &Node, path: &str) -> RenderResult {
        let recurse = |child: &Node, child_path: &str| self.render_node(child, child_path);
        let single = |value: SegmentValue| -> RenderResult {
            Ok(Some(vec![Segment::new(value, node.describe(), path)]))
        };

        match node {
            Node::Empty => Ok(None),
            Node::Text(text) if text.is_empty() => Ok(None),
            Node::Text(text) => single(SegmentValue::Text(text.clone())),
            Node::Fragment(children) => {
                let mut segments = Vec::new();
                for (index, child) in children.iter().enumerate() {
                    if let Some(rendered) = self.render_node(child, &index_path(path, index))? {
                        segments.extend(rendered);
                    }
                }
                Ok(if segments.is_empty() { None } else { Some(segments) })
            }
            Node::Break => single(SegmentValue::Break),
            Node::Pause(pause) => single(SegmentValue::Pause(pause.clone())),
            Node::Thunk(thunk) => single(SegmentValue::Thunk(thunk.clone())),
            Node::Raw(value) => single(SegmentValue::Raw(value.clone())),
            Node::General(element) => {
                let element_path = element_path(path, &element.tag().to_string());
                self.registry.general().render(element, &element_path, &recurse)
            }
            Node::Native(element) => {
                let element_path = element_path(path, element.name());
                if element.platform() != self.registry.platform() {
                    return Err(RenderError::new(RenderErrorKind::PlatformMismatch {
                        name: element.name().clone(),
                        path: element_path,
                        element_platform: element.platform().clone(),
                        renderer_platform: self.registry.platform().to_string(),
                    })
                    .into());
                }

                let component = self.registry.get(element.name()).ok_or_else(|| {
                    RenderError::new(RenderErrorKind::UnknownComponent {
                        platform: self.registry.platform().to_string(),
                        name: element.name().clone(),
                        path: element_path.clone(),
                    })
                })?;

                component.render(element, &element_path, &recurse)
            }
            Node::Function(element) => {
                let expanded = element.expand()?;
                self.render_node(&expanded, &element_path(path, element.name()))
            }
        }
    }
}

/// Render a tree and keep only its text, failing on anything else.
///
/// Convenience for platforms or tests that only send plain messages.
pub fn render_plain_text(renderer: &Renderer, node: &Node) -> CourierResult<Vec<String>> {
    let Some(segments) = renderer.render(node)? else {
        return Ok(Vec::new());
    };
    crate::assert_kinds(&segments, &[SegmentKind::Text, SegmentKind::Break])?;
    Ok(segments
        .iter()
        .filter_map(Segment::as_text)
        .map(str::to_string)
        .collect())
}
