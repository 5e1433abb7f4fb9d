//! Path construction and placement checks for component authors.

use crate::Recurse;
use courier_core::{Node, Segment, SegmentKind};
use courier_error::{CourierResult, RenderError, RenderErrorKind};

/// Path of the `index`-th child of a fragment or children list.
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// Path of an element rendered at `parent`.
pub fn element_path(parent: &str, name: &str) -> String {
    format!("{}#{}", parent, name)
}

/// Path of a named slot of the element at `parent`.
pub fn slot_path(parent: &str, slot: &str) -> String {
    format!("{}.{}", parent, slot)
}

/// Render a children list, concatenating the segments in order.
///
/// Returns `None` when every child renders to nothing.
pub fn render_children(
    recurse: Recurse<'_>,
    children: &[Node],
    path: &str,
) -> CourierResult<Option<Vec<Segment>>> {
    let mut segments = Vec::new();
    for (index, child) in children.iter().enumerate() {
        if let Some(rendered) = recurse(child, &index_path(path, index))? {
            segments.extend(rendered);
        }
    }
    Ok(if segments.is_empty() { None } else { Some(segments) })
}

/// Check that every segment has one of the `expected` kinds.
///
/// # Errors
///
/// Returns an invalid placement error naming the first offending segment's
/// node and path.
pub fn assert_kinds(segments: &[Segment], expected: &[SegmentKind]) -> CourierResult<()> {
    for segment in segments {
        let kind = segment.kind();
        if !expected.contains(&kind) {
            let expected = expected
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" or ");
            return Err(RenderError::new(RenderErrorKind::InvalidPlacement {
                node: segment.node().clone(),
                path: segment.path().clone(),
                expected,
                found: kind.to_string(),
            })
            .into());
        }
    }
    Ok(())
}

/// Render children that may only contain text and join it.
///
/// `node` and `path` describe the parent for error messages; children are
/// rendered below `path`.
///
/// # Errors
///
/// Returns an invalid placement error if a child renders anything but text.
pub fn render_text_content(
    recurse: Recurse<'_>,
    children: &[Node],
    node: &str,
    path: &str,
) -> CourierResult<Option<String>> {
    let Some(segments) = render_children(recurse, children, path)? else {
        return Ok(None);
    };

    assert_kinds(&segments, &[SegmentKind::Text]).inspect_err(|_| {
        tracing::debug!(parent = node, path, "Non-text child in text-only element");
    })?;

    let text: String = segments.iter().filter_map(Segment::as_text).collect();
    Ok(Some(text))
}
