//! Suspendable dialogue scripts for courier.
//!
//! Scripts are written as declarative [`ScriptNode`] trees and compiled into
//! a flat list of [`ScriptCommand`]s. The interpreter ([`execute`]) runs a
//! call stack until it finishes or stops at a prompt; the stack can then be
//! persisted per channel and resumed with the next input.
//!
//! # Example
//!
//! ```
//! use courier_script::{CallStatus, ExecuteContext, Script, ScriptNode, execute};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let script = Arc::new(
//!     Script::build("ask", vec![
//!         ScriptNode::content(|_| "hi".into()),
//!         ScriptNode::prompt("ASK").with_set_vars(|_, input| input.clone()).into(),
//!         ScriptNode::content(|c| c.vars["answer"].as_str().unwrap_or_default().into()),
//!     ])
//!     .unwrap(),
//! );
//! let context = ExecuteContext { platform: "test", channel: "test.1" };
//!
//! let first = execute(context, vec![CallStatus::new(script, json!({}))], true, None).await.unwrap();
//! assert!(!first.finished);
//!
//! let input = json!({ "answer": "yes" });
//! let second = execute(context, first.stack.unwrap(), false, Some(&input)).await.unwrap();
//! assert!(second.finished);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod command;
mod execute;
mod library;
mod runtime;
mod script;

pub use builder::{CallNode, PromptNode, ScriptNode};
pub(crate) use builder::compile;
pub use command::{
    Circumstances, ConditionFn, ContentFn, InputFilterFn, InputVarsFn, ScriptCommand, VarsFn,
};
pub use execute::{CallStatus, ExecuteContext, ExecuteResult, execute};
pub use library::{ScriptLibrary, SerializedFrame};
pub use runtime::{
    RunResult, STATE_KEY, STATE_VERSION, ScriptProcessor, ScriptRuntime, ScriptStateRecord,
    StartOptions,
};
pub use script::Script;
