//! Native Graph API components.
//!
//! | Element | Segment | Value |
//! |---|---|---|
//! | `image` | unit | Messenger image attachment |
//! | `button` | part | template button |
//! | `button_template` | unit | Messenger button template |
//! | `photo` | unit | page photo for posts and comments |
//! | `post` | unit | page feed post |

use super::GRAPH_PLATFORM;
use crate::common::{invalid_props, required_prop, slot_parts};
use courier_core::{NativeElement, Segment, UnitValue};
use courier_render::{
    ComponentRegistry, NativeComponent, Recurse, RenderResult, render_text_content,
};
use serde_json::{Value as JsonValue, json};

/// Registry with every Graph API component.
pub fn graph_components() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new(GRAPH_PLATFORM);
    registry
        .register(Image)
        .register(Button)
        .register(ButtonTemplate)
        .register(Photo)
        .register(Post);
    registry
}

struct Image;

impl NativeComponent for Image {
    fn name(&self) -> &str {
        "image"
    }

    fn render(&self, element: &NativeElement, path: &str, _recurse: Recurse<'_>) -> RenderResult {
        let url = required_prop(element, path, "url")?;
        let reusable = element
            .props()
            .get("reusable")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false);

        let payload = json!({
            "type": "image",
            "message": {
                "attachment": {
                    "type": "image",
                    "payload": { "url": url, "is_reusable": reusable },
                },
            },
        });
        Ok(Some(vec![Segment::unit(UnitValue::new(payload), "<image>", path)]))
    }
}

struct Button;

impl NativeComponent for Button {
    fn name(&self) -> &str {
        "button"
    }

    fn render(&self, element: &NativeElement, path: &str, _recurse: Recurse<'_>) -> RenderResult {
        let title = required_prop(element, path, "title")?;
        let value = match (element.prop_str("url"), element.prop_str("payload")) {
            (Some(url), None) => json!({ "type": "web_url", "title": title, "url": url }),
            (None, Some(payload)) => {
                json!({ "type": "postback", "title": title, "payload": payload })
            }
            _ => {
                return Err(invalid_props(
                    element,
                    path,
                    "exactly one of 'url' or 'payload' is required",
                ));
            }
        };
        Ok(Some(vec![Segment::part(value, "<button>", path)]))
    }
}

struct ButtonTemplate;

impl NativeComponent for ButtonTemplate {
    fn name(&self) -> &str {
        "button_template"
    }

    fn render(&self, element: &NativeElement, path: &str, recurse: Recurse<'_>) -> RenderResult {
        let buttons = slot_parts(element, path, recurse, "buttons")?;
        if buttons.is_empty() {
            return Err(invalid_props(element, path, "at least one button is required"));
        }
        let text = render_text_content(recurse, element.children(), "<button_template>", path)?
            .unwrap_or_default();

        let payload = json!({
            "type": "template",
            "message": {
                "attachment": {
                    "type": "template",
                    "payload": {
                        "template_type": "button",
                        "text": text,
                        "buttons": buttons,
                    },
                },
            },
        });
        Ok(Some(vec![Segment::unit(UnitValue::new(payload), "<button_template>", path)]))
    }
}

struct Photo;

impl NativeComponent for Photo {
    fn name(&self) -> &str {
        "photo"
    }

    fn render(&self, element: &NativeElement, path: &str, recurse: Recurse<'_>) -> RenderResult {
        let url = required_prop(element, path, "url")?;
        let mut payload = json!({ "type": "photo", "url": url });
        if let Some(caption) = render_text_content(recurse, element.children(), "<photo>", path)? {
            payload["caption"] = JsonValue::String(caption);
        }
        Ok(Some(vec![Segment::unit(UnitValue::new(payload), "<photo>", path)]))
    }
}

struct Post;

impl NativeComponent for Post {
    fn name(&self) -> &str {
        "post"
    }

    fn render(&self, element: &NativeElement, path: &str, recurse: Recurse<'_>) -> RenderResult {
        let message = render_text_content(recurse, element.children(), "<post>", path)?;
        let link = element.prop_str("link");
        if message.is_none() && link.is_none() {
            return Ok(None);
        }

        let mut payload = json!({ "type": "post" });
        if let Some(message) = message {
            payload["message"] = JsonValue::String(message);
        }
        if let Some(link) = link {
            payload["link"] = JsonValue::String(link.to_string());
        }
        Ok(Some(vec![Segment::unit(UnitValue::new(payload), "<post>", path)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Node, SegmentValue};
    use courier_render::Renderer;

    fn element(name: &str) -> NativeElement {
        NativeElement::new(GRAPH_PLATFORM, name)
    }

    #[test]
    fn test_button_template_collects_buttons() {
        let buttons = Node::fragment(vec![
            element("button")
                .with_props(json!({ "title": "Go", "url": "https://example.com" }))
                .into(),
            element("button")
                .with_props(json!({ "title": "Pick", "payload": "PICK" }))
                .into(),
        ]);
        let template = element("button_template")
            .with_children(vec![Node::text("Choose")])
            .with_slot("buttons", buttons);

        let renderer = Renderer::new(graph_components());
        let segments = renderer.render(&template.into()).unwrap().unwrap();
        assert_eq!(segments.len(), 1);

        let SegmentValue::Unit(unit) = segments[0].value() else {
            panic!("expected unit");
        };
        let payload = &unit.payload()["message"]["attachment"]["payload"];
        assert_eq!(payload["text"], "Choose");
        assert_eq!(payload["buttons"][0]["type"], "web_url");
        assert_eq!(payload["buttons"][1]["payload"], "PICK");
    }

    #[test]
    fn test_button_requires_one_action() {
        let button = element("button").with_props(json!({ "title": "Nope" }));
        let renderer = Renderer::new(graph_components());
        assert!(renderer.render(&button.into()).is_err());
    }

    #[test]
    fn test_template_rejects_text_in_buttons_slot() {
        let template = element("button_template")
            .with_children(vec![Node::text("Choose")])
            .with_slot("buttons", Node::text("not a button"));

        let renderer = Renderer::new(graph_components());
        assert!(renderer.render(&template.into()).is_err());
    }

    #[test]
    fn test_empty_post_renders_nothing() {
        let renderer = Renderer::new(graph_components());
        assert!(renderer.render(&element("post").into()).unwrap().is_none());
    }
}
