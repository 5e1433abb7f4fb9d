//! Graph API batch execution.

use super::GRAPH_PLATFORM;
use async_trait::async_trait;
use courier_core::{Job, JobResult};
use courier_error::{ExecutionError, ExecutionErrorKind};
use courier_interface::{ExecuteOutcome, Worker};
use courier_rate_limit::{CourierConfig, DetectedLimits, HeaderRateLimitDetector};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use tracing::{debug, error, instrument, warn};
use url::form_urlencoded;

const DEFAULT_API_BASE: &str = "https://graph.facebook.com/v19.0/";
const BATCH: &str = "batch";
const USAGE_WARN_PERCENT: u32 = 90;

fn file_field(index: usize) -> String {
    format!("file{}", index)
}

fn encode_params(params: &JsonValue, access_token: &str) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if let Some(map) = params.as_object() {
        for (key, value) in map {
            match value {
                JsonValue::String(s) => serializer.append_pair(key, s),
                JsonValue::Null => continue,
                other => serializer.append_pair(key, &other.to_string()),
            };
        }
    }
    serializer.append_pair("access_token", access_token);
    serializer.finish()
}

/// Build the `batch` parameter for a Graph batch request.
///
/// Every item carries the access token of its job's page, so one batch may
/// span pages. Jobs with a file reference it as `file<index>`.
///
/// # Errors
///
/// Fails when no token is known for a job's channel.
pub fn build_batch(
    jobs: &[Job],
    tokens: &HashMap<String, String>,
) -> Result<JsonValue, ExecutionError> {
    let mut items = Vec::with_capacity(jobs.len());
    for (index, job) in jobs.iter().enumerate() {
        let Some(token) = tokens.get(&job.channel) else {
            return Err(ExecutionError::new(ExecutionErrorKind::Api {
                code: 401,
                url: job.request.url.clone(),
                message: format!("no access token for channel '{}'", job.channel),
            }));
        };

        let encoded = encode_params(&job.request.params, token);
        let mut item = if job.request.method.eq_ignore_ascii_case("GET") {
            json!({
                "method": "GET",
                "relative_url": format!("{}?{}", job.request.url, encoded),
            })
        } else {
            json!({
                "method": job.request.method,
                "relative_url": job.request.url,
                "body": encoded,
            })
        };
        if job.request.file.is_some() {
            item["attached_files"] = JsonValue::String(file_field(index));
        }
        items.push(item);
    }
    Ok(JsonValue::Array(items))
}

fn failure_for_all(len: usize, error: ExecutionError) -> ExecuteOutcome {
    ExecuteOutcome::Failure {
        errors: vec![error],
        results: vec![None; len],
    }
}

fn error_message(body: &JsonValue) -> String {
    body.pointer("/error/message")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

/// Match the items of a batch response back to the jobs.
///
/// A `null` item means the job was not run. Results of the jobs that
/// succeeded are kept even when others failed.
pub fn parse_batch_response(jobs: &[Job], response: &JsonValue) -> ExecuteOutcome {
    let Some(items) = response.as_array().filter(|items| items.len() == jobs.len()) else {
        return failure_for_all(
            jobs.len(),
            ExecutionError::new(ExecutionErrorKind::Transport(format!(
                "expected {} batch items, got {}",
                jobs.len(),
                response.as_array().map_or(0, Vec::len)
            ))),
        );
    };

    let mut results = Vec::with_capacity(jobs.len());
    let mut errors = Vec::new();
    for (index, (job, item)) in jobs.iter().zip(items).enumerate() {
        if item.is_null() {
            errors.push(ExecutionError::new(ExecutionErrorKind::Skipped(index)));
            results.push(None);
            continue;
        }

        let code = item
            .get("code")
            .and_then(JsonValue::as_u64)
            .and_then(|code| u16::try_from(code).ok())
            .unwrap_or(0);
        let body = match item.get("body") {
            Some(JsonValue::String(raw)) => {
                serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.clone()))
            }
            Some(other) => other.clone(),
            None => JsonValue::Null,
        };

        if (200..300).contains(&code) {
            results.push(Some(JobResult { code, body }));
        } else {
            errors.push(ExecutionError::new(ExecutionErrorKind::Api {
                code,
                url: job.request.url.clone(),
                message: error_message(&body),
            }));
            results.push(None);
        }
    }

    if errors.is_empty() {
        ExecuteOutcome::Success(results.into_iter().flatten().collect())
    } else {
        ExecuteOutcome::Failure { errors, results }
    }
}

/// Executes jobs as one Graph API batch request.
#[derive(Debug, Clone)]
pub struct GraphBatchWorker {
    client: Client,
    api_base: String,
    tokens: HashMap<String, String>,
    detector: HeaderRateLimitDetector,
}

impl GraphBatchWorker {
    /// Worker posting batches to `api_base`.
    pub fn new(api_base: impl Into<String>) -> Self {
        let api_base = api_base.into();
        debug!(api_base = %api_base, "Creating Graph batch worker");
        Self {
            client: Client::new(),
            api_base,
            tokens: HashMap::new(),
            detector: HeaderRateLimitDetector::new(),
        }
    }

    /// Worker using the configured Graph API base.
    pub fn from_config(config: &CourierConfig) -> Self {
        Self::new(config.api_base(GRAPH_PLATFORM).unwrap_or(DEFAULT_API_BASE))
    }

    /// Access token used for jobs of `page_id`.
    pub fn with_token(mut self, page_id: impl Into<String>, token: impl Into<String>) -> Self {
        self.tokens.insert(page_id.into(), token.into());
        self
    }

    /// Rate limit signals seen in responses.
    pub fn detector(&self) -> &HeaderRateLimitDetector {
        &self.detector
    }

    fn form(&self, jobs: &[Job], batch: &JsonValue, token: &str) -> Result<Form, ExecutionError> {
        let mut form = Form::new()
            .text(BATCH, batch.to_string())
            .text("access_token", token.to_string())
            .text("include_headers", "false");

        for (index, job) in jobs.iter().enumerate() {
            let Some(file) = &job.request.file else {
                continue;
            };
            let mut part = Part::bytes(file.data().clone());
            if let Some(name) = file.file_name() {
                part = part.file_name(name.clone());
            }
            if let Some(content_type) = file.content_type() {
                part = part.mime_str(content_type).map_err(|e| {
                    ExecutionError::new(ExecutionErrorKind::Transport(format!(
                        "invalid content type '{}': {}",
                        content_type, e
                    )))
                })?;
            }
            form = form.part(file_field(index), part);
        }
        Ok(form)
    }

    async fn send_batch(&self, jobs: &[Job]) -> Result<JsonValue, ExecutionError> {
        let batch = build_batch(jobs, &self.tokens)?;
        let token = jobs
            .first()
            .and_then(|job| self.tokens.get(&job.channel))
            .cloned()
            .unwrap_or_default();

        let request = self.client.post(&self.api_base);
        let request = if jobs.iter().any(|job| job.request.file.is_some()) {
            request.multipart(self.form(jobs, &batch, &token)?)
        } else {
            let fields = [
                (BATCH, batch.to_string()),
                ("access_token", token),
                ("include_headers", "false".to_string()),
            ];
            request.form(&fields)
        };

        let response = request.send().await.map_err(|e| {
            error!(error = ?e, "Failed to send Graph batch");
            ExecutionError::new(ExecutionErrorKind::Transport(format!("Request failed: {}", e)))
        })?;

        let status = response.status();
        let limits = self.detector.detect(response.headers()).await;
        if limits.is_some_and(|l| l.is_near_limit(USAGE_WARN_PERCENT)) {
            warn!(limits = ?limits, "Graph app usage is near its limit");
        }

        let body: JsonValue = response.json().await.map_err(|e| {
            ExecutionError::new(ExecutionErrorKind::Transport(format!(
                "Failed to parse batch response: {}",
                e
            )))
        })?;

        if !status.is_success() {
            error!(status = %status, "Graph batch request failed");
            return Err(batch_error(status.as_u16(), &body, limits));
        }
        Ok(body)
    }
}

fn batch_error(code: u16, body: &JsonValue, limits: Option<DetectedLimits>) -> ExecutionError {
    let retry_after = limits.and_then(|l| l.retry_after);
    if code == 429 || retry_after.is_some() {
        return ExecutionError::new(ExecutionErrorKind::RateLimited {
            url: BATCH.to_string(),
            retry_after: retry_after.map_or(1, |d| d.as_secs().max(1)),
        });
    }
    ExecutionError::new(ExecutionErrorKind::Api {
        code,
        url: BATCH.to_string(),
        message: error_message(body),
    })
}

#[async_trait]
impl Worker for GraphBatchWorker {
    #[instrument(skip_all, fields(jobs = jobs.len()))]
    async fn execute_jobs(&self, jobs: &[Job]) -> ExecuteOutcome {
        if jobs.is_empty() {
            return ExecuteOutcome::Success(Vec::new());
        }
        match self.send_batch(jobs).await {
            Ok(items) => parse_batch_response(jobs, &items),
            Err(e) => failure_for_all(jobs.len(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_params_stringifies_values() {
        let encoded = encode_params(&json!({ "message": "a b", "published": false }), "T");
        assert_eq!(encoded, "message=a+b&published=false&access_token=T");
    }

    #[test]
    fn test_batch_error_prefers_rate_limit() {
        let error = batch_error(429, &json!({}), None);
        assert!(error.is_retryable());

        let error = batch_error(400, &json!({ "error": { "message": "bad" } }), None);
        assert!(error.to_string().contains("bad"));
        assert!(!error.is_retryable());
    }
}
