//! Compiled script commands.

use crate::Script;
use courier_core::Node;
use futures::future::BoxFuture;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// What a script function sees when it is evaluated.
#[derive(Debug, Clone, Copy)]
pub struct Circumstances<'a> {
    /// Platform of the conversation
    pub platform: &'a str,
    /// Channel the script runs in
    pub channel: &'a str,
    /// Variables of the current script invocation
    pub vars: &'a JsonValue,
}

/// Produces content from the current variables.
pub type ContentFn = Arc<dyn for<'a> Fn(Circumstances<'a>) -> BoxFuture<'a, Node> + Send + Sync>;

/// Computes a complete variables value.
pub type VarsFn = Arc<dyn for<'a> Fn(Circumstances<'a>) -> BoxFuture<'a, JsonValue> + Send + Sync>;

/// Decides a conditional branch.
pub type ConditionFn = Arc<dyn for<'a> Fn(Circumstances<'a>) -> BoxFuture<'a, bool> + Send + Sync>;

/// Computes new variables from a value: prompt input or a callee's return value.
pub type InputVarsFn = Arc<
    dyn for<'a> Fn(Circumstances<'a>, &'a JsonValue) -> BoxFuture<'a, JsonValue> + Send + Sync,
>;

/// Accepts or rejects prompt input.
pub type InputFilterFn =
    Arc<dyn for<'a> Fn(Circumstances<'a>, &'a JsonValue) -> BoxFuture<'a, bool> + Send + Sync>;

/// One instruction of a compiled script.
///
/// Commands hold no mutable state; every field is either a constant or an
/// async function of the circumstances.
#[derive(Clone, derive_more::Display)]
pub enum ScriptCommand {
    /// Append content to the output
    #[display("content")]
    Content(ContentFn),
    /// Replace the variables
    #[display("set_vars")]
    SetVars(VarsFn),
    /// Move the cursor by a signed offset
    #[display("jump")]
    Jump {
        /// Relative target
        offset: isize,
    },
    /// Jump when `condition() != is_not`, otherwise advance by one
    #[display("jump_cond")]
    JumpCond {
        /// Branch condition
        condition: ConditionFn,
        /// Negates the condition
        is_not: bool,
        /// Relative target
        offset: isize,
    },
    /// Suspend until input arrives
    #[display("prompt")]
    Prompt {
        /// Label of the suspension point
        key: String,
        /// Variables after the input is accepted
        set_vars: Option<InputVarsFn>,
        /// Rejects input, keeping the script suspended
        filter: Option<InputFilterFn>,
    },
    /// Run another script as a nested invocation
    #[display("call")]
    Call {
        /// Label of the call point
        key: String,
        /// Callee
        script: Arc<Script>,
        /// Entry label of the callee
        goto: Option<String>,
        /// Initial variables of the callee
        with_vars: Option<VarsFn>,
        /// Variables after the callee returns, given its return value
        set_vars: Option<InputVarsFn>,
    },
    /// Finish the invocation
    #[display("return")]
    Return {
        /// Value handed to the caller
        value: Option<VarsFn>,
    },
}

impl std::fmt::Debug for ScriptCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jump { offset } => write!(f, "Jump({})", offset),
            Self::JumpCond { is_not, offset, .. } => {
                write!(f, "JumpCond(is_not: {}, offset: {})", is_not, offset)
            }
            Self::Prompt { key, .. } => write!(f, "Prompt({})", key),
            Self::Call { key, script, .. } => write!(f, "Call({} -> {})", key, script.name()),
            other => write!(f, "{}", other),
        }
    }
}
