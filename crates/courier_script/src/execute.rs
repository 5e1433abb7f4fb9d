//! The script interpreter.

use crate::{Circumstances, Script, ScriptCommand};
use courier_core::Node;
use courier_error::{CourierResult, ScriptError, ScriptErrorKind};
use futures::future::BoxFuture;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// One frame of a call stack.
#[derive(Debug, Clone)]
pub struct CallStatus {
    /// Script of the invocation
    pub script: Arc<Script>,
    /// Full variable environment of the invocation
    pub vars: JsonValue,
    /// Label the invocation is stopped at; `None` means the start
    pub stop_at: Option<String>,
}

impl CallStatus {
    /// Frame at the start of `script`.
    pub fn new(script: Arc<Script>, vars: JsonValue) -> Self {
        Self {
            script,
            vars,
            stop_at: None,
        }
    }

    /// Frame stopped at `label`.
    pub fn with_stop_at(mut self, label: impl Into<String>) -> Self {
        self.stop_at = Some(label.into());
        self
    }
}

/// Outcome of one interpreter run.
#[derive(Debug, Clone)]
pub struct ExecuteResult {
    /// Whether the outermost script finished
    pub finished: bool,
    /// Content emitted during the run, in order
    pub content: Vec<Node>,
    /// Value returned by the outermost script
    pub return_value: Option<JsonValue>,
    /// Suspended call stack, outer to inner; `None` once finished
    pub stack: Option<Vec<CallStatus>>,
}

/// Where the interpreter runs.
#[derive(Debug, Clone, Copy)]
pub struct ExecuteContext<'a> {
    /// Platform of the conversation
    pub platform: &'a str,
    /// Channel of the conversation
    pub channel: &'a str,
}

impl<'a> ExecuteContext<'a> {
    fn circumstances<'b>(&self, vars: &'b JsonValue) -> Circumstances<'b>
    where
        'a: 'b,
    {
        Circumstances {
            platform: self.platform,
            channel: self.channel,
            vars,
        }
    }
}

/// Result of running one invocation until it stops.
enum Invocation {
    Finished { value: Option<JsonValue> },
    Suspended {
        frames: Vec<CallStatus>,
    },
}

/// Run a call stack.
///
/// With `is_beginning` the innermost frame starts at its `stop_at` label (or
/// its first command). Otherwise the innermost frame must be stopped at a
/// prompt: its filter and setter are applied to `input` and execution
/// continues after the prompt. When the filter rejects the input the stack is
/// returned unchanged with no content.
///
/// Finished frames unwind into their parent's `call` command, whose setter
/// receives the return value before the parent continues.
///
/// # Errors
///
/// Fails when the stack is empty, or when a stop label is missing or points at
/// the wrong kind of command, which means the persisted stack no longer
/// matches the compiled scripts.
pub async fn execute(
    context: ExecuteContext<'_>,
    mut stack: Vec<CallStatus>,
    is_beginning: bool,
    input: Option<&JsonValue>,
) -> CourierResult<ExecuteResult> {
    let top = stack
        .pop()
        .ok_or_else(|| ScriptError::new(ScriptErrorKind::EmptyStack))?;
    let mut content = Vec::new();

    let mut invocation = if is_beginning {
        let begin = top.script.start_index(top.stop_at.as_deref())?;
        run_invocation(context, &top.script, top.vars, begin, &mut content).await?
    } else {
        let label = top.stop_at.clone().unwrap_or_default();
        let (index, command) = top.script.command_at(&label)?;
        let ScriptCommand::Prompt {
            set_vars, filter, ..
        } = command
        else {
            return Err(top.script.unexpected_command(&label, "prompt", command).into());
        };

        let input = input.unwrap_or(&JsonValue::Null);
        let accepted = match filter {
            Some(filter) => filter(context.circumstances(&top.vars), input).await,
            None => true,
        };
        if !accepted {
            warn!(script = %top.script.name(), prompt = %label, "Prompt input rejected");
            stack.push(top);
            return Ok(ExecuteResult {
                finished: false,
                content,
                return_value: None,
                stack: Some(stack),
            });
        }
        let vars = match set_vars {
            Some(set_vars) => set_vars(context.circumstances(&top.vars), input).await,
            None => top.vars.clone(),
        };
        run_invocation(context, &top.script, vars, index + 1, &mut content).await?
    };

    loop {
        match invocation {
            Invocation::Suspended { frames } => {
                stack.extend(frames);
                debug!(depth = stack.len(), "Script suspended");
                return Ok(ExecuteResult {
                    finished: false,
                    content,
                    return_value: None,
                    stack: Some(stack),
                });
            }
            Invocation::Finished { value } => {
                let Some(parent) = stack.pop() else {
                    debug!("Script finished");
                    return Ok(ExecuteResult {
                        finished: true,
                        content,
                        return_value: value,
                        stack: None,
                    });
                };

                let label = parent.stop_at.clone().unwrap_or_default();
                let (index, command) = parent.script.command_at(&label)?;
                let vars = match command {
                    ScriptCommand::Call {
                        set_vars: Some(set_vars),
                        ..
                    } => {
                        set_vars(
                            context.circumstances(&parent.vars),
                            value.as_ref().unwrap_or(&JsonValue::Null),
                        )
                        .await
                    }
                    ScriptCommand::Call { .. } => parent.vars.clone(),
                    other => {
                        return Err(parent.script.unexpected_command(&label, "call", other).into());
                    }
                };
                trace!(script = %parent.script.name(), call = %label, "Returned to caller");
                invocation =
                    run_invocation(context, &parent.script, vars, index + 1, &mut content).await?;
            }
        }
    }
}

/// Run one invocation from `begin` until it finishes or suspends.
///
/// Boxed because nested calls recurse.
fn run_invocation<'a>(
    context: ExecuteContext<'a>,
    script: &'a Arc<Script>,
    mut vars: JsonValue,
    begin: usize,
    content: &'a mut Vec<Node>,
) -> BoxFuture<'a, CourierResult<Invocation>> {
    Box::pin(async move {
        let commands = script.commands();
        let mut cursor = begin;

        while let Some(command) = commands.get(cursor) {
            trace!(script = %script.name(), cursor, command = %command, "Executing command");
            match command {
                ScriptCommand::Content(render) => {
                    let node = render(context.circumstances(&vars)).await;
                    content.push(node);
                    cursor += 1;
                }
                ScriptCommand::SetVars(set_vars) => {
                    let next = set_vars(context.circumstances(&vars)).await;
                    vars = next;
                    cursor += 1;
                }
                ScriptCommand::Jump { offset } => {
                    cursor = jump(script, cursor, *offset)?;
                }
                ScriptCommand::JumpCond {
                    condition,
                    is_not,
                    offset,
                } => {
                    let holds = condition(context.circumstances(&vars)).await;
                    cursor = if holds != *is_not {
                        jump(script, cursor, *offset)?
                    } else {
                        cursor + 1
                    };
                }
                ScriptCommand::Prompt { key, .. } => {
                    return Ok(Invocation::Suspended {
                        frames: vec![
                            CallStatus::new(script.clone(), vars).with_stop_at(key.clone()),
                        ],
                    });
                }
                ScriptCommand::Call {
                    key,
                    script: callee,
                    goto,
                    with_vars,
                    set_vars,
                } => {
                    let callee_vars = match with_vars {
                        Some(with_vars) => with_vars(context.circumstances(&vars)).await,
                        None => JsonValue::Object(Default::default()),
                    };
                    let begin = callee.start_index(goto.as_deref())?;

                    match run_invocation(context, callee, callee_vars, begin, &mut *content).await? {
                        Invocation::Suspended { frames } => {
                            let mut stack = vec![
                                CallStatus::new(script.clone(), vars).with_stop_at(key.clone()),
                            ];
                            stack.extend(frames);
                            return Ok(Invocation::Suspended { frames: stack });
                        }
                        Invocation::Finished { value } => {
                            if let Some(set_vars) = set_vars {
                                let next = set_vars(
                                    context.circumstances(&vars),
                                    value.as_ref().unwrap_or(&JsonValue::Null),
                                )
                                .await;
                                vars = next;
                            }
                            cursor += 1;
                        }
                    }
                }
                ScriptCommand::Return { value } => {
                    let value = match value {
                        Some(f) => Some(f(context.circumstances(&vars)).await),
                        None => None,
                    };
                    return Ok(Invocation::Finished { value });
                }
            }
        }

        Ok(Invocation::Finished { value: None })
    })
}

fn jump(script: &Script, cursor: usize, offset: isize) -> CourierResult<usize> {
    let target = cursor as isize + offset;
    if target < 0 || target as usize > script.commands().len() {
        return Err(ScriptError::new(ScriptErrorKind::JumpOutOfRange {
            script: script.name().clone(),
            index: target,
        })
        .into());
    }
    Ok(target as usize)
}
