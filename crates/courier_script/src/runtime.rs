//! Channel-scoped script runtimes with persisted call stacks.

use crate::{CallStatus, ExecuteContext, ScriptLibrary, SerializedFrame, execute};
use courier_core::Node;
use courier_error::{
    CourierResult, JsonError, ScriptError, ScriptErrorKind, StateError, StateErrorKind,
};
use courier_storage::{StateStore, updater};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Store key of the persisted runtime record.
pub const STATE_KEY: &str = "$script_runtime";

/// Version of the persisted record layout.
pub const STATE_VERSION: &str = "0";

/// Persisted form of a suspended runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStateRecord {
    /// Record layout version
    pub version: String,
    /// Milliseconds since the epoch of the last save
    pub timestamp: i64,
    /// Call stack, outer to inner
    pub call_stack: Vec<SerializedFrame>,
}

impl ScriptStateRecord {
    /// Read a stored record.
    pub fn from_value(channel: &str, value: JsonValue) -> CourierResult<Self> {
        let invalid = |reason: String| {
            ScriptError::new(ScriptErrorKind::InvalidState {
                channel: channel.to_string(),
                reason,
            })
        };
        let record: Self = serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
        if record.version != STATE_VERSION {
            return Err(invalid(format!("unsupported version '{}'", record.version)).into());
        }
        Ok(record)
    }
}

/// How a new runtime begins.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Initial variables; an empty object when `None`
    pub vars: Option<JsonValue>,
    /// Entry label; the first command when `None`
    pub goto: Option<String>,
}

impl StartOptions {
    /// Set the initial variables.
    pub fn with_vars(mut self, vars: JsonValue) -> Self {
        self.vars = Some(vars);
        self
    }

    /// Set the entry label.
    pub fn with_goto(mut self, label: impl Into<String>) -> Self {
        self.goto = Some(label.into());
        self
    }
}

/// Starts and resumes script runtimes for the channels of one platform.
///
/// At most one runtime per channel may be live: starting one while state is
/// persisted for the channel fails with a conflict.
pub struct ScriptProcessor<S: StateStore> {
    platform: String,
    store: Arc<S>,
    library: Arc<ScriptLibrary>,
}

impl<S: StateStore> ScriptProcessor<S> {
    /// Processor over a store and a library of scripts.
    pub fn new(platform: impl Into<String>, store: Arc<S>, library: ScriptLibrary) -> Self {
        Self {
            platform: platform.into(),
            store,
            library: Arc::new(library),
        }
    }

    /// The scripts this processor can run.
    pub fn library(&self) -> &ScriptLibrary {
        &self.library
    }

    /// Begin a new runtime of `script` in `channel`.
    ///
    /// # Errors
    ///
    /// Returns a conflict state error when the channel already has persisted
    /// state, and a script error when the script or entry label is unknown.
    #[instrument(skip(self, options), fields(platform = %self.platform))]
    pub async fn start(
        &self,
        channel: &str,
        script: &str,
        options: StartOptions,
    ) -> CourierResult<ScriptRuntime<S>> {
        if self.store.get(channel, STATE_KEY).await?.is_some() {
            return Err(StateError::new(StateErrorKind::Conflict(channel.to_string())).into());
        }

        let script = self.library.get(script)?;
        script.start_index(options.goto.as_deref())?;

        let frame = CallStatus {
            script,
            vars: options.vars.unwrap_or_else(|| json!({})),
            stop_at: options.goto,
        };
        debug!(channel, "Starting script runtime");
        Ok(self.runtime(channel, vec![frame], true, None))
    }

    /// Load the runtime persisted for `channel`, if any.
    #[instrument(skip(self), fields(platform = %self.platform))]
    pub async fn continue_channel(&self, channel: &str) -> CourierResult<Option<ScriptRuntime<S>>> {
        let Some(value) = self.store.get(channel, STATE_KEY).await? else {
            return Ok(None);
        };
        let record = ScriptStateRecord::from_value(channel, value)?;
        let stack = self.library.deserialize_stack(&record.call_stack)?;
        debug!(channel, depth = stack.len(), "Loaded script runtime");
        Ok(Some(self.runtime(channel, stack, false, Some(record.timestamp))))
    }

    /// Delete the persisted runtime of `channel`, returning whether one existed.
    #[instrument(skip(self), fields(platform = %self.platform))]
    pub async fn abort(&self, channel: &str) -> CourierResult<bool> {
        self.store.delete(channel, STATE_KEY).await
    }

    fn runtime(
        &self,
        channel: &str,
        stack: Vec<CallStatus>,
        is_beginning: bool,
        timestamp: Option<i64>,
    ) -> ScriptRuntime<S> {
        ScriptRuntime {
            platform: self.platform.clone(),
            channel: channel.to_string(),
            store: self.store.clone(),
            stack,
            is_beginning,
            timestamp,
            finished: false,
            return_value: None,
        }
    }
}

/// Content produced by one [`ScriptRuntime::run`].
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Whether the script finished
    pub finished: bool,
    /// Content emitted, in order
    pub content: Vec<Node>,
    /// Value returned by the outermost script
    pub return_value: Option<JsonValue>,
}

impl RunResult {
    /// The content as a single tree ready to dispatch.
    pub fn content_node(&self) -> Node {
        Node::fragment(self.content.clone())
    }
}

/// A script invocation bound to one channel.
///
/// # Example
///
/// ```rust,ignore
/// let mut runtime = match processor.continue_channel(&channel).await? {
///     Some(runtime) => runtime,
///     None => processor.start(&channel, "onboarding", StartOptions::default()).await?,
/// };
/// let result = runtime.run(Some(&input)).await?;
/// runtime.save().await?;
/// engine.dispatch(chat, &result.content_node(), &compiler).await?;
/// ```
pub struct ScriptRuntime<S: StateStore> {
    platform: String,
    channel: String,
    store: Arc<S>,
    stack: Vec<CallStatus>,
    is_beginning: bool,
    timestamp: Option<i64>,
    finished: bool,
    return_value: Option<JsonValue>,
}

impl<S: StateStore> ScriptRuntime<S> {
    /// Channel the runtime belongs to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Current call stack, outer to inner; empty once finished.
    pub fn call_stack(&self) -> &[CallStatus] {
        &self.stack
    }

    /// Whether the script finished.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Value returned by the outermost script once finished.
    pub fn return_value(&self) -> Option<&JsonValue> {
        self.return_value.as_ref()
    }

    /// Run until the script finishes or suspends at a prompt.
    ///
    /// A freshly started runtime ignores `input`; a resumed one hands it to
    /// the prompt it is stopped at.
    #[instrument(skip(self, input), fields(platform = %self.platform, channel = %self.channel))]
    pub async fn run(&mut self, input: Option<&JsonValue>) -> CourierResult<RunResult> {
        if self.finished {
            let kind = ScriptErrorKind::AlreadyFinished(self.channel.clone());
            return Err(ScriptError::new(kind).into());
        }

        let context = ExecuteContext {
            platform: &self.platform,
            channel: &self.channel,
        };
        let result = execute(context, self.stack.clone(), self.is_beginning, input).await?;

        self.is_beginning = false;
        self.finished = result.finished;
        self.stack = result.stack.unwrap_or_default();
        self.return_value = result.return_value.clone();

        if self.finished {
            info!("Script finished");
        } else {
            debug!(depth = self.stack.len(), "Script waiting for input");
        }
        Ok(RunResult {
            finished: result.finished,
            content: result.content,
            return_value: result.return_value,
        })
    }

    /// Persist the call stack, or delete the record once finished.
    ///
    /// Returns whether a record remains stored.
    ///
    /// # Errors
    ///
    /// Returns a conflict state error when the stored record changed since
    /// this runtime loaded it.
    #[instrument(skip(self), fields(platform = %self.platform, channel = %self.channel))]
    pub async fn save(&mut self) -> CourierResult<bool> {
        let expected = self.timestamp;
        let finished = self.finished;
        let channel = self.channel.clone();
        let call_stack = ScriptLibrary::serialize_stack(&self.stack);
        let now = chrono::Utc::now().timestamp_millis();

        let stored = self
            .store
            .update(
                &self.channel,
                STATE_KEY,
                updater(move |current| {
                    let current_timestamp = current
                        .as_ref()
                        .and_then(|record| record.get("timestamp"))
                        .and_then(JsonValue::as_i64);
                    if current_timestamp != expected {
                        return Err(StateError::new(StateErrorKind::Conflict(channel)).into());
                    }
                    if finished {
                        return Ok(None);
                    }

                    let record = ScriptStateRecord {
                        version: STATE_VERSION.to_string(),
                        timestamp: current_timestamp.map_or(now, |old| now.max(old + 1)),
                        call_stack,
                    };
                    serde_json::to_value(&record)
                        .map(Some)
                        .map_err(|e| JsonError::encoding("script runtime", e).into())
                }),
            )
            .await?;

        self.timestamp = stored
            .as_ref()
            .and_then(|record| record.get("timestamp"))
            .and_then(JsonValue::as_i64);
        debug!(stored = stored.is_some(), "Saved script runtime");
        Ok(stored.is_some())
    }
}
