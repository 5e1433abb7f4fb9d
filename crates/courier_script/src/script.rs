//! Compiled scripts.

use crate::{ScriptCommand, ScriptNode, compile};
use courier_error::{CourierResult, ScriptError, ScriptErrorKind};
use derive_getters::Getters;
use std::collections::HashMap;
use tracing::debug;

/// An immutable compiled dialogue script.
///
/// `entries_index` maps every label, prompt key and call key to the index of
/// its command.
#[derive(Debug, Getters)]
pub struct Script {
    name: String,
    commands: Vec<ScriptCommand>,
    entries_index: HashMap<String, usize>,
}

impl Script {
    /// Resolve and compile a declarative script.
    ///
    /// # Errors
    ///
    /// Fails when a label, prompt key or call key is used twice.
    pub fn build(name: impl Into<String>, nodes: Vec<ScriptNode>) -> CourierResult<Self> {
        let name = name.into();
        let compiled = compile(&name, nodes)?;
        debug!(
            script = %name,
            commands = compiled.commands.len(),
            entries = compiled.entries_index.len(),
            "Compiled script"
        );
        Ok(Self {
            name,
            commands: compiled.commands,
            entries_index: compiled.entries_index,
        })
    }

    /// Index of the command at `label`.
    pub fn index_of(&self, label: &str) -> CourierResult<usize> {
        self.entries_index.get(label).copied().ok_or_else(|| {
            ScriptError::new(ScriptErrorKind::LabelNotFound {
                script: self.name.clone(),
                label: label.to_string(),
            })
            .into()
        })
    }

    /// Start index for an optional label; the first command when `None`.
    pub fn start_index(&self, label: Option<&str>) -> CourierResult<usize> {
        label.map_or(Ok(0), |label| self.index_of(label))
    }

    /// Command at `label`.
    pub(crate) fn command_at(&self, label: &str) -> CourierResult<(usize, &ScriptCommand)> {
        let index = self.index_of(label)?;
        match self.commands.get(index) {
            Some(command) => Ok((index, command)),
            None => Err(self.unexpected_command(label, "command", "end of script").into()),
        }
    }

    /// Error for a stop point that is not the expected kind of command.
    pub(crate) fn unexpected_command(
        &self,
        label: &str,
        expected: &str,
        found: impl ToString,
    ) -> ScriptError {
        ScriptError::new(ScriptErrorKind::UnexpectedCommand {
            script: self.name.clone(),
            label: label.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}
