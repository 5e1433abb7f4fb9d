//! Telegram chats.

use super::TELEGRAM_PLATFORM;
use crate::common::invalid_segment;
use courier_core::{Job, Request, Segment, SegmentValue};
use courier_error::CourierResult;
use courier_interface::{DispatchTarget, JobCompiler};
use serde_json::{Value as JsonValue, json};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, instrument};

/// A chat as seen by one bot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_getters::Getters)]
pub struct TelegramChat {
    bot_id: String,
    chat_id: i64,
}

impl TelegramChat {
    /// Chat `chat_id` of the bot `bot_id`.
    pub fn new(bot_id: impl Into<String>, chat_id: i64) -> Self {
        Self {
            bot_id: bot_id.into(),
            chat_id,
        }
    }
}

impl DispatchTarget for TelegramChat {
    fn platform(&self) -> &str {
        TELEGRAM_PLATFORM
    }

    fn uid(&self) -> String {
        format!("telegram.{}.{}", self.bot_id, self.chat_id)
    }
}

/// Send options applied to a dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_", strip_option)]
pub struct TelegramChatOptions {
    /// Send silently
    disable_notification: bool,
    /// `MarkdownV2`, `HTML` or `Markdown` for texts and captions
    #[setters(into)]
    parse_mode: Option<String>,
    /// Message the first job sent by the compiler replies to
    reply_to_message_id: Option<i64>,
}

/// Compiles segments into Bot API calls.
///
/// Text is sent with `sendMessage`. Unit and raw values are
/// `{ "method", "params" }` objects and name their own method.
#[derive(Debug, Default)]
pub struct TelegramChatCompiler {
    options: TelegramChatOptions,
    replied: AtomicBool,
}

impl TelegramChatCompiler {
    /// Compiler with the given options.
    pub fn new(options: TelegramChatOptions) -> Self {
        Self {
            options,
            replied: AtomicBool::new(false),
        }
    }

    /// Options applied to every job.
    pub fn options(&self) -> &TelegramChatOptions {
        &self.options
    }

    fn apply_options(&self, params: &mut JsonValue) {
        let Some(map) = params.as_object_mut() else {
            return;
        };
        if self.options.disable_notification {
            map.insert("disable_notification".to_string(), JsonValue::Bool(true));
        }
        let formatted = map.contains_key("text") || map.contains_key("caption");
        if let Some(parse_mode) = self.options.parse_mode.as_ref().filter(|_| formatted) {
            map.entry("parse_mode").or_insert_with(|| json!(parse_mode));
        }
        let reply_to = self
            .options
            .reply_to_message_id
            .filter(|_| !self.replied.swap(true, Ordering::SeqCst));
        if let Some(reply_to) = reply_to {
            map.insert("reply_to_message_id".to_string(), json!(reply_to));
        }
    }
}

fn method_call(value: &JsonValue) -> Option<(&str, JsonValue)> {
    let method = value.get("method")?.as_str()?;
    let params = value.get("params").cloned().unwrap_or_else(|| json!({}));
    params.is_object().then_some((method, params))
}

impl JobCompiler<TelegramChat> for TelegramChatCompiler {
    #[instrument(skip_all, fields(target = %target.uid(), segments = segments.len()))]
    fn compile(&self, target: &TelegramChat, segments: Vec<Segment>) -> CourierResult<Vec<Job>> {
        let mut jobs = Vec::with_capacity(segments.len());

        for segment in &segments {
            let (method, mut params, file) = match segment.value() {
                SegmentValue::Text(text) => ("sendMessage", json!({ "text": text }), None),
                SegmentValue::Unit(unit) => {
                    let Some((method, params)) = method_call(unit.payload()) else {
                        return Err(invalid_segment(segment, target.uid(), "unit names no method"));
                    };
                    (method, params, unit.file().clone())
                }
                SegmentValue::Raw(value) => {
                    let Some((method, params)) = method_call(value) else {
                        return Err(invalid_segment(
                            segment,
                            target.uid(),
                            "raw value names no method",
                        ));
                    };
                    (method, params, None)
                }
                _ => {
                    return Err(invalid_segment(
                        segment,
                        target.uid(),
                        format!("{} segments cannot be sent as messages", segment.kind()),
                    ));
                }
            };

            params["chat_id"] = json!(target.chat_id());
            self.apply_options(&mut params);

            let request = Request::post(method, params).with_file(file);
            jobs.push(Job::new(target.bot_id().clone(), request).with_key(target.uid()));
        }

        debug!(jobs = jobs.len(), "Compiled telegram jobs");
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::UnitValue;

    fn chat() -> TelegramChat {
        TelegramChat::new("42", 1001)
    }

    #[test]
    fn test_options_and_methods() {
        let compiler = TelegramChatCompiler::new(
            TelegramChatOptions::default()
                .with_disable_notification(true)
                .with_parse_mode("HTML")
                .with_reply_to_message_id(7),
        );
        let photo = UnitValue::new(json!({
            "method": "sendPhoto",
            "params": { "photo": "https://x/p.png" },
        }));
        let jobs = compiler
            .compile(
                &chat(),
                vec![
                    Segment::text("hello", "\"hello\"", "$[0]"),
                    Segment::unit(photo, "<photo>", "$[1]"),
                ],
            )
            .unwrap();

        assert_eq!(jobs[0].request.url, "sendMessage");
        assert_eq!(jobs[0].channel, "42");
        assert_eq!(jobs[0].key.as_deref(), Some("telegram.42.1001"));
        assert_eq!(
            jobs[0].request.params,
            json!({
                "text": "hello",
                "chat_id": 1001,
                "disable_notification": true,
                "parse_mode": "HTML",
                "reply_to_message_id": 7,
            })
        );
        assert_eq!(jobs[1].request.url, "sendPhoto");
        assert_eq!(
            jobs[1].request.params,
            json!({ "photo": "https://x/p.png", "chat_id": 1001, "disable_notification": true })
        );
    }

    #[test]
    fn test_unit_without_method_is_rejected() {
        let unit = UnitValue::new(json!({ "text": "x" }));
        let err = TelegramChatCompiler::default()
            .compile(&chat(), vec![Segment::unit(unit, "<custom>", "$")])
            .unwrap_err();
        assert!(err.to_string().contains("unit names no method"));
    }
}
