//! Helpers shared by platform components and compilers.

use courier_core::{NativeElement, Segment, SegmentKind, SegmentValue};
use courier_error::{
    CompileError, CompileErrorKind, CourierError, CourierResult, RenderError, RenderErrorKind,
};
use courier_render::{Recurse, assert_kinds, slot_path};
use serde_json::Value as JsonValue;

/// Error for an element whose props cannot be rendered.
pub(crate) fn invalid_props(
    element: &NativeElement,
    path: &str,
    reason: impl Into<String>,
) -> CourierError {
    RenderError::new(RenderErrorKind::InvalidProps {
        name: element.name().clone(),
        path: path.to_string(),
        reason: reason.into(),
    })
    .into()
}

/// A required string prop.
pub(crate) fn required_prop<'a>(
    element: &'a NativeElement,
    path: &str,
    key: &str,
) -> CourierResult<&'a str> {
    element
        .prop_str(key)
        .ok_or_else(|| invalid_props(element, path, format!("missing string prop '{}'", key)))
}

/// Values of `part` segments, in order.
pub(crate) fn part_values(segments: Vec<Segment>) -> Vec<JsonValue> {
    segments
        .into_iter()
        .filter_map(|segment| match segment.into_value() {
            SegmentValue::Part(value) => Some(value),
            _ => None,
        })
        .collect()
}

/// Error for a segment a compiler cannot turn into a job.
pub(crate) fn invalid_segment(
    segment: &Segment,
    target: String,
    reason: impl Into<String>,
) -> CourierError {
    CompileError::new(CompileErrorKind::InvalidSegment {
        node: segment.node().clone(),
        path: segment.path().clone(),
        target,
        reason: reason.into(),
    })
    .into()
}

/// Merge `extra` into an object value, overwriting existing keys.
pub(crate) fn merge_object(mut base: JsonValue, extra: &JsonValue) -> JsonValue {
    if let (Some(base_map), Some(extra_map)) = (base.as_object_mut(), extra.as_object()) {
        for (key, value) in extra_map {
            base_map.insert(key.clone(), value.clone());
        }
    }
    base
}

/// Render a named slot whose content must be `part` segments.
pub(crate) fn slot_parts(
    element: &NativeElement,
    path: &str,
    recurse: Recurse<'_>,
    slot: &str,
) -> CourierResult<Vec<JsonValue>> {
    let Some(node) = element.slots().get(slot) else {
        return Ok(Vec::new());
    };
    let segments = recurse(node, &slot_path(path, slot))?.unwrap_or_default();
    assert_kinds(&segments, &[SegmentKind::Part])?;
    Ok(part_values(segments))
}
