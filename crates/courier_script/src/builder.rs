//! Declarative script trees and their compilation into commands.

use crate::{
    Circumstances, ConditionFn, ContentFn, InputFilterFn, InputVarsFn, Script, ScriptCommand, VarsFn,
};
use courier_core::Node;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use courier_error::{CourierResult, ScriptError, ScriptErrorKind};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// A suspension point awaiting input.
#[derive(Clone)]
pub struct PromptNode {
    key: String,
    set_vars: Option<InputVarsFn>,
    filter: Option<InputFilterFn>,
}

impl PromptNode {
    /// Compute the new variables from the accepted input.
    pub fn with_set_vars<F>(self, f: F) -> Self
    where
        F: Fn(&Circumstances<'_>, &JsonValue) -> JsonValue + Send + Sync + 'static,
    {
        self.with_set_vars_async(move |c, input| future::ready(f(&c, input)).boxed())
    }

    /// Compute the new variables from the accepted input asynchronously.
    pub fn with_set_vars_async<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(Circumstances<'a>, &'a JsonValue) -> BoxFuture<'a, JsonValue>
            + Send
            + Sync
            + 'static,
    {
        self.set_vars = Some(Arc::new(f));
        self
    }

    /// Reject input for which `f` returns false; the script stays at the prompt.
    pub fn with_filter<F>(self, f: F) -> Self
    where
        F: Fn(&Circumstances<'_>, &JsonValue) -> bool + Send + Sync + 'static,
    {
        self.with_filter_async(move |c, input| future::ready(f(&c, input)).boxed())
    }

    /// Asynchronous input filter.
    pub fn with_filter_async<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(Circumstances<'a>, &'a JsonValue) -> BoxFuture<'a, bool>
            + Send
            + Sync
            + 'static,
    {
        self.filter = Some(Arc::new(f));
        self
    }
}

/// A nested script invocation.
#[derive(Clone)]
pub struct CallNode {
    key: String,
    script: Arc<Script>,
    goto: Option<String>,
    with_vars: Option<VarsFn>,
    set_vars: Option<InputVarsFn>,
}

impl CallNode {
    /// Enter the callee at a label instead of its first command.
    pub fn with_goto(mut self, label: impl Into<String>) -> Self {
        self.goto = Some(label.into());
        self
    }

    /// Initial variables of the callee.
    pub fn with_vars<F>(self, f: F) -> Self
    where
        F: Fn(&Circumstances<'_>) -> JsonValue + Send + Sync + 'static,
    {
        self.with_vars_async(move |c| future::ready(f(&c)).boxed())
    }

    /// Initial variables of the callee, computed asynchronously.
    pub fn with_vars_async<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(Circumstances<'a>) -> BoxFuture<'a, JsonValue> + Send + Sync + 'static,
    {
        self.with_vars = Some(Arc::new(f));
        self
    }

    /// Variables after the callee returns, given its return value.
    pub fn with_set_vars<F>(self, f: F) -> Self
    where
        F: Fn(&Circumstances<'_>, &JsonValue) -> JsonValue + Send + Sync + 'static,
    {
        self.with_set_vars_async(move |c, value| future::ready(f(&c, value)).boxed())
    }

    /// Variables after the callee returns, computed asynchronously.
    pub fn with_set_vars_async<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(Circumstances<'a>, &'a JsonValue) -> BoxFuture<'a, JsonValue>
            + Send
            + Sync
            + 'static,
    {
        self.set_vars = Some(Arc::new(f));
        self
    }
}

/// One element of a declarative script.
///
/// # Examples
///
/// ```
/// use courier_script::{Script, ScriptNode};
/// use serde_json::json;
///
/// let script = Script::build("greeting", vec![
///     ScriptNode::content(|_| "What's your name?".into()),
///     ScriptNode::prompt("ASK_NAME").with_set_vars(|_, input| json!({ "name": input })).into(),
///     ScriptNode::content(|c| format!("Hi {}", c.vars["name"]).into()),
/// ])
/// .unwrap();
///
/// assert_eq!(script.commands().len(), 3);
/// assert_eq!(script.entries_index().get("ASK_NAME"), Some(&1));
/// ```
#[derive(Clone)]
pub enum ScriptNode {
    /// Emit content
    Content(ContentFn),
    /// Replace variables
    Vars(VarsFn),
    /// First branch whose condition holds, else `otherwise`
    If {
        /// Conditions with their bodies
        branches: Vec<(ConditionFn, Vec<ScriptNode>)>,
        /// Body when no condition holds
        otherwise: Vec<ScriptNode>,
    },
    /// Repeat `body` while `condition` holds
    While {
        /// Loop condition
        condition: ConditionFn,
        /// Loop body
        body: Vec<ScriptNode>,
    },
    /// Suspend for input
    Prompt(PromptNode),
    /// Entry point for `goto`
    Label(String),
    /// Run a nested script
    Call(CallNode),
    /// Finish with an optional value
    Return(Option<VarsFn>),
}

impl ScriptNode {
    /// Content node.
    pub fn content<F>(f: F) -> Self
    where
        F: Fn(&Circumstances<'_>) -> Node + Send + Sync + 'static,
    {
        Self::content_async(move |c| future::ready(f(&c)).boxed())
    }

    /// Content node whose content is looked up asynchronously.
    ///
    /// ```
    /// use courier_script::{Script, ScriptNode};
    /// use futures::FutureExt;
    ///
    /// let script = Script::build("profile", vec![ScriptNode::content_async(|c| {
    ///     async move { format!("Hello from {}", c.channel).into() }.boxed()
    /// })])
    /// .unwrap();
    /// assert_eq!(script.commands().len(), 1);
    /// ```
    pub fn content_async<F>(f: F) -> Self
    where
        F: for<'a> Fn(Circumstances<'a>) -> BoxFuture<'a, Node> + Send + Sync + 'static,
    {
        Self::Content(Arc::new(f))
    }

    /// Variable assignment; `f` returns the complete new variables.
    pub fn vars<F>(f: F) -> Self
    where
        F: Fn(&Circumstances<'_>) -> JsonValue + Send + Sync + 'static,
    {
        Self::vars_async(move |c| future::ready(f(&c)).boxed())
    }

    /// Asynchronous variable assignment.
    pub fn vars_async<F>(f: F) -> Self
    where
        F: for<'a> Fn(Circumstances<'a>) -> BoxFuture<'a, JsonValue> + Send + Sync + 'static,
    {
        Self::Vars(Arc::new(f))
    }

    /// Conditional with a single branch.
    pub fn if_then<F>(condition: F, then: Vec<ScriptNode>) -> Self
    where
        F: Fn(&Circumstances<'_>) -> bool + Send + Sync + 'static,
    {
        Self::if_then_async(move |c| future::ready(condition(&c)).boxed(), then)
    }

    /// Conditional with a single branch and an asynchronous condition.
    pub fn if_then_async<F>(condition: F, then: Vec<ScriptNode>) -> Self
    where
        F: for<'a> Fn(Circumstances<'a>) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        Self::If {
            branches: vec![(Arc::new(condition), then)],
            otherwise: Vec::new(),
        }
    }

    /// Add an else-if branch to a conditional; other nodes are returned unchanged.
    pub fn else_if<F>(self, condition: F, then: Vec<ScriptNode>) -> Self
    where
        F: Fn(&Circumstances<'_>) -> bool + Send + Sync + 'static,
    {
        self.else_if_async(move |c| future::ready(condition(&c)).boxed(), then)
    }

    /// Add an else-if branch with an asynchronous condition.
    pub fn else_if_async<F>(self, condition: F, then: Vec<ScriptNode>) -> Self
    where
        F: for<'a> Fn(Circumstances<'a>) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        match self {
            Self::If {
                mut branches,
                otherwise,
            } => {
                branches.push((Arc::new(condition), then));
                Self::If {
                    branches,
                    otherwise,
                }
            }
            other => other,
        }
    }

    /// Set the else body of a conditional; other nodes are returned unchanged.
    pub fn otherwise(self, body: Vec<ScriptNode>) -> Self {
        match self {
            Self::If { branches, .. } => Self::If {
                branches,
                otherwise: body,
            },
            other => other,
        }
    }

    /// Loop node.
    pub fn while_loop<F>(condition: F, body: Vec<ScriptNode>) -> Self
    where
        F: Fn(&Circumstances<'_>) -> bool + Send + Sync + 'static,
    {
        Self::while_async(move |c| future::ready(condition(&c)).boxed(), body)
    }

    /// Loop node with an asynchronous condition.
    pub fn while_async<F>(condition: F, body: Vec<ScriptNode>) -> Self
    where
        F: for<'a> Fn(Circumstances<'a>) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        Self::While {
            condition: Arc::new(condition),
            body,
        }
    }

    /// Prompt node, configured through [`PromptNode`].
    pub fn prompt(key: impl Into<String>) -> PromptNode {
        PromptNode {
            key: key.into(),
            set_vars: None,
            filter: None,
        }
    }

    /// Label node.
    pub fn label(key: impl Into<String>) -> Self {
        Self::Label(key.into())
    }

    /// Call node, configured through [`CallNode`].
    pub fn call(key: impl Into<String>, script: Arc<Script>) -> CallNode {
        CallNode {
            key: key.into(),
            script,
            goto: None,
            with_vars: None,
            set_vars: None,
        }
    }

    /// Return without value.
    pub fn return_() -> Self {
        Self::Return(None)
    }

    /// Return the value computed by `f`.
    pub fn return_value<F>(f: F) -> Self
    where
        F: Fn(&Circumstances<'_>) -> JsonValue + Send + Sync + 'static,
    {
        Self::return_async(move |c| future::ready(f(&c)).boxed())
    }

    /// Return a value computed asynchronously.
    pub fn return_async<F>(f: F) -> Self
    where
        F: for<'a> Fn(Circumstances<'a>) -> BoxFuture<'a, JsonValue> + Send + Sync + 'static,
    {
        Self::Return(Some(Arc::new(f)))
    }
}

impl From<PromptNode> for ScriptNode {
    fn from(node: PromptNode) -> Self {
        Self::Prompt(node)
    }
}

impl From<CallNode> for ScriptNode {
    fn from(node: CallNode) -> Self {
        Self::Call(node)
    }
}

/// Intermediate instruction with symbolic jump targets.
enum Resolved {
    Command(ScriptCommand),
    Tag(String),
    JumpTo(String),
    JumpCondTo {
        condition: ConditionFn,
        is_not: bool,
        tag: String,
    },
}

/// Flattens nodes into instructions with generated internal tags.
#[derive(Default)]
struct Resolver {
    output: Vec<Resolved>,
    next_tag: usize,
}

impl Resolver {
    fn tag(&mut self, kind: &str) -> String {
        self.next_tag += 1;
        format!("\0{}_{}", kind, self.next_tag)
    }

    fn resolve(&mut self, nodes: Vec<ScriptNode>) {
        for node in nodes {
            match node {
                ScriptNode::Content(f) => {
                    self.output.push(Resolved::Command(ScriptCommand::Content(f)))
                }
                ScriptNode::Vars(f) => {
                    self.output.push(Resolved::Command(ScriptCommand::SetVars(f)))
                }
                ScriptNode::If {
                    branches,
                    otherwise,
                } => {
                    let end = self.tag("if_end");
                    for (condition, body) in branches {
                        let next = self.tag("if_next");
                        self.output.push(Resolved::JumpCondTo {
                            condition,
                            is_not: true,
                            tag: next.clone(),
                        });
                        self.resolve(body);
                        self.output.push(Resolved::JumpTo(end.clone()));
                        self.output.push(Resolved::Tag(next));
                    }
                    self.resolve(otherwise);
                    self.output.push(Resolved::Tag(end));
                }
                ScriptNode::While { condition, body } => {
                    let start = self.tag("while_start");
                    let end = self.tag("while_end");
                    self.output.push(Resolved::Tag(start.clone()));
                    self.output.push(Resolved::JumpCondTo {
                        condition,
                        is_not: true,
                        tag: end.clone(),
                    });
                    self.resolve(body);
                    self.output.push(Resolved::JumpTo(start));
                    self.output.push(Resolved::Tag(end));
                }
                ScriptNode::Prompt(prompt) => {
                    self.output.push(Resolved::Command(ScriptCommand::Prompt {
                        key: prompt.key,
                        set_vars: prompt.set_vars,
                        filter: prompt.filter,
                    }))
                }
                ScriptNode::Label(key) => self.output.push(Resolved::Tag(key)),
                ScriptNode::Call(call) => self.output.push(Resolved::Command(ScriptCommand::Call {
                    key: call.key,
                    script: call.script,
                    goto: call.goto,
                    with_vars: call.with_vars,
                    set_vars: call.set_vars,
                })),
                ScriptNode::Return(value) => {
                    self.output.push(Resolved::Command(ScriptCommand::Return { value }))
                }
            }
        }
    }
}

/// Commands and user-visible entry points of a compiled script.
pub(crate) struct Compiled {
    pub commands: Vec<ScriptCommand>,
    pub entries_index: HashMap<String, usize>,
}

/// Resolve control flow and compile it into a flat command list.
///
/// Labels, prompt keys and call keys share one namespace and must be unique.
pub(crate) fn compile(name: &str, nodes: Vec<ScriptNode>) -> CourierResult<Compiled> {
    let mut resolver = Resolver::default();
    resolver.resolve(nodes);

    let duplicate = |key: &str| -> courier_error::CourierError {
        ScriptError::new(ScriptErrorKind::DuplicateKey {
            script: name.to_string(),
            key: key.to_string(),
        })
        .into()
    };

    // First pass: positions of user entries and internal tags
    let mut entries_index = HashMap::new();
    let mut internal_tags = HashMap::new();
    let mut index = 0;
    for item in &resolver.output {
        match item {
            Resolved::Tag(tag) if is_internal(tag) => {
                internal_tags.insert(tag.clone(), index);
            }
            Resolved::Tag(key)
            | Resolved::Command(ScriptCommand::Prompt { key, .. })
            | Resolved::Command(ScriptCommand::Call { key, .. }) => {
                if entries_index.insert(key.clone(), index).is_some() {
                    return Err(duplicate(key));
                }
                if !matches!(item, Resolved::Tag(_)) {
                    index += 1;
                }
            }
            _ => index += 1,
        }
    }

    // Second pass: emit commands with relative offsets
    let target = |tag: &str| -> CourierResult<usize> {
        internal_tags.get(tag).copied().ok_or_else(|| {
            ScriptError::new(ScriptErrorKind::LabelNotFound {
                script: name.to_string(),
                label: tag.to_string(),
            })
            .into()
        })
    };
    let mut commands = Vec::with_capacity(index);
    for item in resolver.output {
        let position = commands.len() as isize;
        match item {
            Resolved::Tag(_) => {}
            Resolved::Command(command) => commands.push(command),
            Resolved::JumpTo(tag) => commands.push(ScriptCommand::Jump {
                offset: target(&tag)? as isize - position,
            }),
            Resolved::JumpCondTo {
                condition,
                is_not,
                tag,
            } => commands.push(ScriptCommand::JumpCond {
                condition,
                is_not,
                offset: target(&tag)? as isize - position,
            }),
        }
    }

    Ok(Compiled {
        commands,
        entries_index,
    })
}

/// Generated tags start with NUL.
fn is_internal(tag: &str) -> bool {
    tag.starts_with('\0')
}
