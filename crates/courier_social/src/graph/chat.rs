//! Messenger chat messages.

use super::GraphChat;
use crate::common::{invalid_segment, merge_object};
use courier_core::{Job, Request, Segment, SegmentValue};
use courier_error::{CompileError, CompileErrorKind, CourierResult};
use courier_interface::{DispatchTarget, JobCompiler};
use serde_json::{Value as JsonValue, json};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, instrument};

const MESSAGES_URL: &str = "me/messages";
const OTN_OPTION: &str = "one_time_notif_token";

/// Send options applied to every message of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_", strip_option, into)]
pub struct GraphChatOptions {
    /// `RESPONSE`, `UPDATE` or `MESSAGE_TAG`
    messaging_type: String,
    /// `REGULAR`, `SILENT_PUSH` or `NO_PUSH`
    notification_type: Option<String>,
    /// Message tag, required with `MESSAGE_TAG`
    tag: Option<String>,
    /// Persona sending the messages
    persona_id: Option<String>,
    /// One-time notification token replacing the recipient id
    one_time_notif_token: Option<String>,
}

impl Default for GraphChatOptions {
    fn default() -> Self {
        Self {
            messaging_type: "RESPONSE".to_string(),
            notification_type: None,
            tag: None,
            persona_id: None,
            one_time_notif_token: None,
        }
    }
}

/// Compiles segments into Send API jobs.
///
/// Text becomes a text message, units carrying a `message` object are sent as
/// that message, and raw values are merged into the request as is. A one-time
/// notification token can address a single message; this compiler refuses to
/// use it twice.
#[derive(Debug, Default)]
pub struct GraphChatCompiler {
    options: GraphChatOptions,
    token_used: AtomicBool,
}

impl GraphChatCompiler {
    /// Compiler with the given options.
    pub fn new(options: GraphChatOptions) -> Self {
        Self {
            options,
            token_used: AtomicBool::new(false),
        }
    }

    /// Options applied to every job.
    pub fn options(&self) -> &GraphChatOptions {
        &self.options
    }

    fn recipient(&self, target: &GraphChat) -> CourierResult<JsonValue> {
        let Some(token) = &self.options.one_time_notif_token else {
            return Ok(json!({ "id": target.user_id() }));
        };
        if self.token_used.swap(true, Ordering::SeqCst) {
            return Err(CompileError::new(CompileErrorKind::SingleUseOption {
                option: OTN_OPTION.to_string(),
            })
            .into());
        }
        Ok(json!({ (OTN_OPTION): token }))
    }

    fn params(&self, target: &GraphChat, message: JsonValue) -> CourierResult<JsonValue> {
        let mut params = json!({
            "messaging_type": self.options.messaging_type,
            "recipient": self.recipient(target)?,
            "message": message,
        });
        if let Some(notification_type) = &self.options.notification_type {
            params["notification_type"] = json!(notification_type);
        }
        if let Some(tag) = &self.options.tag {
            params["tag"] = json!(tag);
        }
        if let Some(persona_id) = &self.options.persona_id {
            params["persona_id"] = json!(persona_id);
        }
        Ok(params)
    }
}

impl JobCompiler<GraphChat> for GraphChatCompiler {
    #[instrument(skip_all, fields(target = %target.uid(), segments = segments.len()))]
    fn compile(&self, target: &GraphChat, segments: Vec<Segment>) -> CourierResult<Vec<Job>> {
        let mut jobs = Vec::with_capacity(segments.len());

        for segment in segments {
            let request = match segment.value() {
                SegmentValue::Text(text) => {
                    Request::post(MESSAGES_URL, self.params(target, json!({ "text": text }))?)
                }
                SegmentValue::Unit(unit) => {
                    let Some(message) = unit.payload().get("message") else {
                        return Err(invalid_segment(
                            &segment,
                            target.uid(),
                            "unit has no message to send",
                        ));
                    };
                    Request::post(MESSAGES_URL, self.params(target, message.clone())?)
                        .with_file(unit.file().clone())
                }
                SegmentValue::Raw(value) => {
                    let params = self.params(target, JsonValue::Null)?;
                    Request::post(MESSAGES_URL, merge_object(params, value))
                }
                _ => {
                    return Err(invalid_segment(
                        &segment,
                        target.uid(),
                        format!("{} segments cannot be sent as messages", segment.kind()),
                    ));
                }
            };

            jobs.push(Job::new(target.page_id().clone(), request).with_key(target.uid()));
        }

        debug!(jobs = jobs.len(), "Compiled chat jobs");
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat() -> GraphChat {
        GraphChat::new("PAGE", "USER")
    }

    #[test]
    fn test_text_message_params() {
        let compiler = GraphChatCompiler::new(
            GraphChatOptions::default()
                .with_messaging_type("UPDATE")
                .with_persona_id("P1"),
        );
        let jobs = compiler
            .compile(&chat(), vec![Segment::text("hello", "\"hello\"", "$")])
            .unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].channel, "PAGE");
        assert_eq!(jobs[0].key.as_deref(), Some("graph.PAGE.USER"));
        assert_eq!(jobs[0].request.url, "me/messages");
        assert_eq!(
            jobs[0].request.params,
            json!({
                "messaging_type": "UPDATE",
                "recipient": { "id": "USER" },
                "message": { "text": "hello" },
                "persona_id": "P1",
            })
        );
    }

    #[test]
    fn test_one_time_token_is_single_use() {
        let compiler = GraphChatCompiler::new(
            GraphChatOptions::default().with_one_time_notif_token("OTN"),
        );
        let segments = vec![
            Segment::text("first", "\"first\"", "$[0]"),
            Segment::text("second", "\"second\"", "$[1]"),
        ];

        let err = compiler.compile(&chat(), segments).unwrap_err();
        assert!(err.to_string().contains("one_time_notif_token"));
    }

    #[test]
    fn test_one_time_token_spans_calls() {
        let compiler = GraphChatCompiler::new(
            GraphChatOptions::default().with_one_time_notif_token("OTN"),
        );

        let jobs = compiler
            .compile(&chat(), vec![Segment::text("first", "\"first\"", "$")])
            .unwrap();
        assert_eq!(
            jobs[0].request.params["recipient"],
            json!({ "one_time_notif_token": "OTN" })
        );
        assert!(
            compiler
                .compile(&chat(), vec![Segment::text("again", "\"again\"", "$")])
                .is_err()
        );
    }

    #[test]
    fn test_part_segment_is_rejected() {
        let compiler = GraphChatCompiler::default();
        let err = compiler
            .compile(&chat(), vec![Segment::part(json!({}), "<button>", "$")])
            .unwrap_err();
        assert!(err.to_string().contains("<button>"));
    }
}
