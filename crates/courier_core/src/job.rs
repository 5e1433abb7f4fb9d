//! Compiled network operations and their results.

use crate::lookup_path;
use courier_error::{ChainingError, ChainingErrorKind, CourierResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Binary payload uploaded with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct FileAttachment {
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

impl FileAttachment {
    /// Create an attachment sent under the given form field.
    pub fn new(field: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            file_name: None,
            content_type: None,
            data,
        }
    }

    /// Set the file name.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Set the MIME type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A platform API request.
///
/// `url` is relative to the platform's API base.
///
/// # Examples
///
/// ```
/// use courier_core::Request;
/// use serde_json::json;
///
/// let request = Request::post("me/messages", json!({ "message": { "text": "hi" } }));
/// assert_eq!(request.method, "POST");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// HTTP method or platform method name
    pub method: String,
    /// URL relative to the platform base
    pub url: String,
    /// Opaque parameters
    pub params: JsonValue,
    /// Optional binary upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileAttachment>,
}

impl Request {
    /// A POST request without upload.
    pub fn post(url: impl Into<String>, params: JsonValue) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            params,
            file: None,
        }
    }

    /// Attach a binary upload.
    pub fn with_file(mut self, file: Option<FileAttachment>) -> Self {
        self.file = file;
        self
    }

    /// Set one parameter, turning `params` into an object when needed.
    pub fn set_param(&mut self, key: impl Into<String>, value: JsonValue) {
        if !self.params.is_object() {
            self.params = JsonValue::Object(Default::default());
        }
        if let JsonValue::Object(map) = &mut self.params {
            map.insert(key.into(), value);
        }
    }
}

/// Access to results registered earlier in the same dispatch.
pub trait ResultLookup {
    /// Extract the value at `path` (`$.a.b`) from the result registered as `key`.
    fn lookup(&self, key: &str, path: &str) -> CourierResult<JsonValue>;
}

impl ResultLookup for HashMap<String, JsonValue> {
    fn lookup(&self, key: &str, path: &str) -> CourierResult<JsonValue> {
        let body = self.get(key).ok_or_else(|| {
            ChainingError::new(ChainingErrorKind::UnregisteredKey(key.to_string()))
        })?;
        Ok(lookup_path(key, body, path)?.clone())
    }
}

/// Pure rewrite of a request once the consumed results are known.
pub type AccomplishRequest =
    Arc<dyn Fn(&Request, &[String], &dyn ResultLookup) -> CourierResult<Request> + Send + Sync>;

/// Consumption of results registered by earlier jobs.
#[derive(Clone)]
pub struct ConsumeResult {
    /// Registration keys that must resolve before the job is sent
    pub keys: Vec<String>,
    /// Request rewrite
    pub accomplish: AccomplishRequest,
}

impl ConsumeResult {
    /// Create a consumption over the given keys.
    pub fn new<F>(keys: Vec<String>, accomplish: F) -> Self
    where
        F: Fn(&Request, &[String], &dyn ResultLookup) -> CourierResult<Request>
            + Send
            + Sync
            + 'static,
    {
        Self {
            keys,
            accomplish: Arc::new(accomplish),
        }
    }
}

impl std::fmt::Debug for ConsumeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumeResult")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

/// One network operation.
///
/// # Examples
///
/// ```
/// use courier_core::{Job, Request};
/// use serde_json::json;
///
/// let job = Job::new("page:1", Request::post("1/photos", json!({})))
///     .with_key("page:1")
///     .with_register_result("photo_0");
///
/// assert_eq!(job.register_result.as_deref(), Some("photo_0"));
/// ```
#[derive(Debug, Clone)]
pub struct Job {
    /// Credential scope the job is executed under
    pub channel: String,
    /// The request to send
    pub request: Request,
    /// Ordering key; jobs sharing a key never interleave
    pub key: Option<String>,
    /// Token under which the result becomes available to later jobs
    pub register_result: Option<String>,
    /// Results of earlier jobs this job depends on
    pub consume_result: Option<ConsumeResult>,
}

impl Job {
    /// A job without ordering key or chaining.
    pub fn new(channel: impl Into<String>, request: Request) -> Self {
        Self {
            channel: channel.into(),
            request,
            key: None,
            register_result: None,
            consume_result: None,
        }
    }

    /// Set the ordering key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Register the result under a token.
    pub fn with_register_result(mut self, token: impl Into<String>) -> Self {
        self.register_result = Some(token.into());
        self
    }

    /// Consume results of earlier jobs.
    pub fn with_consume_result(mut self, consume: ConsumeResult) -> Self {
        self.consume_result = Some(consume);
        self
    }
}

/// Result of one executed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// HTTP status or platform code
    pub code: u16,
    /// Response body
    pub body: JsonValue,
}

impl JobResult {
    /// A result with status 200.
    pub fn ok(body: JsonValue) -> Self {
        Self { code: 200, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_param_on_null_params() {
        let mut request = Request::post("me/messages", JsonValue::Null);
        request.set_param("attachment_id", json!("42"));
        assert_eq!(request.params, json!({ "attachment_id": "42" }));
    }

    #[test]
    fn test_hash_map_lookup() {
        let mut results = HashMap::new();
        results.insert("k".to_string(), json!({ "id": "X" }));

        assert_eq!(results.lookup("k", "$.id").unwrap(), json!("X"));
        assert!(results.lookup("missing", "$.id").is_err());
        assert!(results.lookup("k", "$.nope").is_err());
    }
}
