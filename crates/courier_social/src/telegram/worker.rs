//! Telegram Bot API execution.

use super::TELEGRAM_PLATFORM;
use async_trait::async_trait;
use courier_core::{FileAttachment, Job, JobResult};
use courier_error::{CourierResult, ExecutionError, ExecutionErrorKind, HttpError};
use courier_interface::{ExecuteOutcome, Worker};
use courier_rate_limit::{CourierConfig, telegram_retry_after};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::Value as JsonValue;
use tracing::{debug, error, instrument, warn};

const DEFAULT_API_BASE: &str = "https://api.telegram.org/";

/// Turn a Bot API response into the job result.
///
/// Successful calls yield `result` as body. A 429 becomes a rate limit error
/// carrying the `retry_after` the API asked for.
pub fn parse_telegram_response(
    method: &str,
    status: u16,
    body: &JsonValue,
) -> Result<JobResult, ExecutionError> {
    if body.get("ok").and_then(JsonValue::as_bool) == Some(true) {
        return Ok(JobResult {
            code: status,
            body: body.get("result").cloned().unwrap_or(JsonValue::Null),
        });
    }

    let code = body
        .get("error_code")
        .and_then(JsonValue::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(status);
    if code == 429 {
        return Err(ExecutionError::new(ExecutionErrorKind::RateLimited {
            url: method.to_string(),
            retry_after: telegram_retry_after(body).unwrap_or(1),
        }));
    }

    let message = body
        .get("description")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string());
    Err(ExecutionError::new(ExecutionErrorKind::Api {
        code,
        url: method.to_string(),
        message,
    }))
}

fn form_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Calls Bot API methods one at a time for a single bot.
///
/// Stops at the first failed call; results of the calls before it are kept.
#[derive(Debug, Clone)]
pub struct TelegramWorker {
    client: Client,
    api_base: String,
    bot_id: String,
    token: String,
}

impl TelegramWorker {
    /// Worker for the bot owning `token`.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let bot_id = token.split(':').next().unwrap_or_default().to_string();
        debug!(bot_id = %bot_id, "Creating Telegram worker");
        Self {
            client: Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            bot_id,
            token,
        }
    }

    /// Worker using the configured Telegram API base.
    pub fn from_config(config: &CourierConfig, token: impl Into<String>) -> Self {
        let worker = Self::new(token);
        match config.api_base(TELEGRAM_PLATFORM) {
            Some(base) => worker.with_api_base(base),
            None => worker,
        }
    }

    /// Override the API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Id of the bot, the channel its jobs are compiled for.
    pub fn bot_id(&self) -> &str {
        &self.bot_id
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}bot{}/{}", self.api_base, self.token, method)
    }

    fn multipart(params: &JsonValue, file: &FileAttachment) -> Result<Form, ExecutionError> {
        let mut form = Form::new();
        if let Some(map) = params.as_object() {
            for (key, value) in map {
                form = form.text(key.clone(), form_value(value));
            }
        }

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
        Ok(form.part(file.field().clone(), part))
    }

    /// Fetch the bot's own user with `getMe`, verifying the token.
    ///
    /// # Errors
    ///
    /// Returns an HTTP error when the API cannot be reached and an execution
    /// error when it rejects the token.
    #[instrument(skip(self), fields(bot_id = %self.bot_id))]
    pub async fn get_me(&self) -> CourierResult<JsonValue> {
        let response = self
            .client
            .post(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| HttpError::new(format!("Request failed: {}", e)))?;
        let status = response.status().as_u16();
        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| {
                HttpError::new(format!("Failed to parse response: {}", e)).with_status(status)
            })?;

        let me = parse_telegram_response("getMe", status, &body)?;
        debug!(username = ?me.body.get("username"), "Verified bot token");
        Ok(me.body)
    }

    #[instrument(skip_all, fields(method = %job.request.url))]
    async fn call(&self, job: &Job) -> Result<JobResult, ExecutionError> {
        if job.channel != self.bot_id {
            return Err(ExecutionError::new(ExecutionErrorKind::Api {
                code: 401,
                url: job.request.url.clone(),
                message: format!("job for bot '{}' sent to bot '{}'", job.channel, self.bot_id),
            }));
        }

        let method = &job.request.url;
        let request = self.client.post(self.method_url(method));
        let request = match &job.request.file {
            Some(file) => request.multipart(Self::multipart(&job.request.params, file)?),
            None => request.json(&job.request.params),
        };

        let response = request.send().await.map_err(|e| {
            error!(error = ?e, "Failed to call Telegram");
            ExecutionError::new(ExecutionErrorKind::Transport(format!("Request failed: {}", e)))
        })?;
        let status = response.status().as_u16();
        let body: JsonValue = response.json().await.map_err(|e| {
            ExecutionError::new(ExecutionErrorKind::Transport(format!(
                "Failed to parse response: {}",
                e
            )))
        })?;

        parse_telegram_response(method, status, &body)
    }
}

#[async_trait]
impl Worker for TelegramWorker {
    #[instrument(skip_all, fields(bot_id = %self.bot_id, jobs = jobs.len()))]
    async fn execute_jobs(&self, jobs: &[Job]) -> ExecuteOutcome {
        let mut results = Vec::with_capacity(jobs.len());
        for job in jobs {
            match self.call(job).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(error = %e, done = results.len(), "Telegram call failed");
                    let mut partial: Vec<Option<JobResult>> =
                        results.into_iter().map(Some).collect();
                    partial.resize(jobs.len(), None);
                    return ExecuteOutcome::Failure {
                        errors: vec![e],
                        results: partial,
                    };
                }
            }
        }
        ExecuteOutcome::Success(results)
    }
}
