//! Native Telegram components.
//!
//! `message` and `photo` render to units naming their Bot API method;
//! `button` renders to an inline keyboard button part.

use super::TELEGRAM_PLATFORM;
use crate::common::{invalid_props, required_prop, slot_parts};
use courier_core::{NativeElement, Segment, UnitValue};
use courier_render::{
    ComponentRegistry, NativeComponent, Recurse, RenderResult, render_text_content,
};
use serde_json::{Value as JsonValue, json};

/// Registry with every Telegram component.
pub fn telegram_components() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new(TELEGRAM_PLATFORM);
    registry.register(Message).register(Photo).register(Button);
    registry
}

fn inline_keyboard(buttons: Vec<JsonValue>) -> JsonValue {
    let rows: Vec<JsonValue> = buttons.into_iter().map(|b| json!([b])).collect();
    json!({ "inline_keyboard": rows })
}

struct Message;

impl NativeComponent for Message {
    fn name(&self) -> &str {
        "message"
    }

    fn render(&self, element: &NativeElement, path: &str, recurse: Recurse<'_>) -> RenderResult {
        let Some(text) = render_text_content(recurse, element.children(), "<message>", path)? else {
            return Ok(None);
        };

        let mut params = json!({ "text": text });
        if let Some(parse_mode) = element.prop_str("parse_mode") {
            params["parse_mode"] = json!(parse_mode);
        }
        let buttons = slot_parts(element, path, recurse, "keyboard")?;
        if !buttons.is_empty() {
            params["reply_markup"] = inline_keyboard(buttons);
        }

        let payload = json!({ "method": "sendMessage", "params": params });
        Ok(Some(vec![Segment::unit(UnitValue::new(payload), "<message>", path)]))
    }
}

struct Photo;

impl NativeComponent for Photo {
    fn name(&self) -> &str {
        "photo"
    }

    fn render(&self, element: &NativeElement, path: &str, recurse: Recurse<'_>) -> RenderResult {
        let url = required_prop(element, path, "url")?;
        let mut params = json!({ "photo": url });
        if let Some(caption) = render_text_content(recurse, element.children(), "<photo>", path)? {
            params["caption"] = JsonValue::String(caption);
        }

        let payload = json!({ "method": "sendPhoto", "params": params });
        Ok(Some(vec![Segment::unit(UnitValue::new(payload), "<photo>", path)]))
    }
}

struct Button;

impl NativeComponent for Button {
    fn name(&self) -> &str {
        "button"
    }

    fn render(&self, element: &NativeElement, path: &str, _recurse: Recurse<'_>) -> RenderResult {
        let text = required_prop(element, path, "text")?;
        let value = match (element.prop_str("url"), element.prop_str("data")) {
            (Some(url), None) => json!({ "text": text, "url": url }),
            (None, Some(data)) => json!({ "text": text, "callback_data": data }),
            _ => {
                return Err(invalid_props(
                    element,
                    path,
                    "exactly one of 'url' or 'data' is required",
                ));
            }
        };
        Ok(Some(vec![Segment::part(value, "<button>", path)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Node, SegmentValue};
    use courier_render::Renderer;

    #[test]
    fn test_message_with_keyboard() {
        let message = NativeElement::new(TELEGRAM_PLATFORM, "message")
            .with_children(vec![Node::text("Pick one")])
            .with_slot(
                "keyboard",
                NativeElement::new(TELEGRAM_PLATFORM, "button")
                    .with_props(json!({ "text": "A", "data": "a" }))
                    .into(),
            );

        let segments = Renderer::new(telegram_components())
            .render(&message.into())
            .unwrap()
            .unwrap();
        let SegmentValue::Unit(unit) = segments[0].value() else {
            panic!("expected unit");
        };
        assert_eq!(
            unit.payload(),
            &json!({
                "method": "sendMessage",
                "params": {
                    "text": "Pick one",
                    "reply_markup": {
                        "inline_keyboard": [[{ "text": "A", "callback_data": "a" }]]
                    },
                },
            })
        );
    }

    #[test]
    fn test_photo_requires_url() {
        let photo = NativeElement::new(TELEGRAM_PLATFORM, "photo");
        let err = Renderer::new(telegram_components())
            .render(&photo.into())
            .unwrap_err();
        assert!(err.to_string().contains("missing string prop 'url'"));
    }
}
