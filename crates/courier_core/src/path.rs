//! Minimal dot-path evaluator for result lookups.

use courier_error::{ChainingError, ChainingErrorKind, CourierResult};
use serde_json::Value as JsonValue;

/// Resolve a `$.a.b.0` style path inside a registered result body.
///
/// `$` is the body itself; each following segment selects an object field or,
/// when numeric, an array index. A missing segment is an error.
///
/// # Examples
///
/// ```
/// use courier_core::lookup_path;
/// use serde_json::json;
///
/// let body = json!({ "id": "17", "images": [{ "src": "a.png" }] });
/// assert_eq!(lookup_path("photo", &body, "$.id").unwrap(), &json!("17"));
/// assert_eq!(lookup_path("photo", &body, "$.images.0.src").unwrap(), &json!("a.png"));
/// assert!(lookup_path("photo", &body, "$.post_id").is_err());
/// ```
pub fn lookup_path<'a>(key: &str, body: &'a JsonValue, path: &str) -> CourierResult<&'a JsonValue> {
    let rest = path.strip_prefix('$').ok_or_else(|| {
        ChainingError::new(ChainingErrorKind::InvalidPath {
            path: path.to_string(),
            reason: "path must start with '$'".to_string(),
        })
    })?;

    if rest.is_empty() {
        return Ok(body);
    }

    let rest = rest.strip_prefix('.').ok_or_else(|| {
        ChainingError::new(ChainingErrorKind::InvalidPath {
            path: path.to_string(),
            reason: "expected '.' after '$'".to_string(),
        })
    })?;

    let mut current = body;
    for segment in rest.split('.') {
        if segment.is_empty() {
            return Err(ChainingError::new(ChainingErrorKind::InvalidPath {
                path: path.to_string(),
                reason: "empty path segment".to_string(),
            })
            .into());
        }

        let next = match current {
            JsonValue::Object(map) => map.get(segment),
            JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };

        current = next.ok_or_else(|| {
            ChainingError::new(ChainingErrorKind::PathNotFound {
                key: key.to_string(),
                path: path.to_string(),
            })
        })?;
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_path_returns_body() {
        let body = json!({ "id": 1 });
        assert_eq!(lookup_path("k", &body, "$").unwrap(), &body);
    }

    #[test]
    fn test_malformed_paths_rejected() {
        let body = json!({ "id": 1 });
        assert!(lookup_path("k", &body, "id").is_err());
        assert!(lookup_path("k", &body, "$id").is_err());
        assert!(lookup_path("k", &body, "$..id").is_err());
    }

    #[test]
    fn test_scalar_cannot_be_indexed() {
        let body = json!({ "id": "17" });
        assert!(lookup_path("k", &body, "$.id.value").is_err());
    }
}
