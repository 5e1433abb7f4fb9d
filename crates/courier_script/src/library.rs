//! Script library and call stack serialization.

use crate::{CallStatus, Script, ScriptCommand};
use courier_error::{CourierResult, ScriptError, ScriptErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A call stack frame as persisted: the script by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedFrame {
    /// Script name
    pub name: String,
    /// Variables of the invocation
    pub vars: JsonValue,
    /// Label the invocation is stopped at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_at: Option<String>,
}

/// Scripts addressable by their unique name.
///
/// Registering a script also registers every script it calls.
#[derive(Debug, Clone, Default)]
pub struct ScriptLibrary {
    scripts: HashMap<String, Arc<Script>>,
}

impl ScriptLibrary {
    /// Empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script and its callees.
    ///
    /// # Errors
    ///
    /// Fails when a different script with the same name is already registered.
    pub fn register(&mut self, script: Arc<Script>) -> CourierResult<&mut Self> {
        let mut pending = vec![script];
        while let Some(script) = pending.pop() {
            match self.scripts.get(script.name()) {
                Some(existing) if Arc::ptr_eq(existing, &script) => continue,
                Some(_) => {
                    let kind = ScriptErrorKind::DuplicateScript(script.name().clone());
                    return Err(ScriptError::new(kind).into());
                }
                None => {}
            }
            for command in script.commands() {
                if let ScriptCommand::Call { script: callee, .. } = command {
                    pending.push(callee.clone());
                }
            }
            debug!(script = %script.name(), "Registered script");
            self.scripts.insert(script.name().clone(), script);
        }
        Ok(self)
    }

    /// Script by name.
    pub fn get(&self, name: &str) -> CourierResult<Arc<Script>> {
        self.scripts
            .get(name)
            .cloned()
            .ok_or_else(|| {
                ScriptError::new(ScriptErrorKind::UnknownScript(name.to_string())).into()
            })
    }

    /// Registered script names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scripts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Persistable form of a call stack.
    pub fn serialize_stack(stack: &[CallStatus]) -> Vec<SerializedFrame> {
        stack
            .iter()
            .map(|frame| SerializedFrame {
                name: frame.script.name().clone(),
                vars: frame.vars.clone(),
                stop_at: frame.stop_at.clone(),
            })
            .collect()
    }

    /// Rebuild a call stack, resolving scripts by name.
    pub fn deserialize_stack(&self, frames: &[SerializedFrame]) -> CourierResult<Vec<CallStatus>> {
        frames
            .iter()
            .map(|frame| {
                Ok(CallStatus {
                    script: self.get(&frame.name)?,
                    vars: frame.vars.clone(),
                    stop_at: frame.stop_at.clone(),
                })
            })
            .collect()
    }
}
