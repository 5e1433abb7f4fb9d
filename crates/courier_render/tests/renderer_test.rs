//! Renderer behavior tests with mock native components.

use courier_core::{
    FunctionElement, GeneralTag, NativeElement, Node, Pause, Segment, SegmentKind, SegmentValue,
    UnitValue,
};
use courier_error::{CourierErrorKind, CourierResult, RenderErrorKind};
use courier_render::{
    ComponentRegistry, NativeComponent, Recurse, RenderResult, Renderer, assert_kinds,
    render_children, render_plain_text, slot_path,
};
use serde_json::{Value as JsonValue, json};

/// Renders a quick-reply button as a part.
struct MockButton;

impl NativeComponent for MockButton {
    fn name(&self) -> &str {
        "button"
    }

    fn render(&self, element: &NativeElement, path: &str, _recurse: Recurse<'_>) -> RenderResult {
        let title = element.prop_str("title").unwrap_or_default();
        Ok(Some(vec![Segment::part(
            json!({ "title": title }),
            "<button>",
            path,
        )]))
    }
}

/// Renders a text message with a slot of buttons as one unit.
struct MockButtonTemplate;

impl NativeComponent for MockButtonTemplate {
    fn name(&self) -> &str {
        "button_template"
    }

    fn render(&self, element: &NativeElement, path: &str, recurse: Recurse<'_>) -> RenderResult {
        let buttons = match element.slots().get("buttons") {
            Some(slot) => recurse(slot, &slot_path(path, "buttons"))?.unwrap_or_default(),
            None => Vec::new(),
        };
        assert_kinds(&buttons, &[SegmentKind::Part])?;

        let values: Vec<JsonValue> = buttons
            .into_iter()
            .filter_map(|segment| match segment.into_value() {
                SegmentValue::Part(value) => Some(value),
                _ => None,
            })
            .collect();

        let children = render_children(recurse, element.children(), path)?.unwrap_or_default();
        let text: String = children.iter().filter_map(Segment::as_text).collect();

        Ok(Some(vec![Segment::unit(
            UnitValue::new(json!({ "type": "template", "text": text, "buttons": values })),
            "<button_template>",
            path,
        )]))
    }
}

fn renderer() -> Renderer {
    let mut registry = ComponentRegistry::new("graph");
    registry.register(MockButton).register(MockButtonTemplate);
    Renderer::new(registry)
}

fn button(title: &str) -> Node {
    NativeElement::new("graph", "button")
        .with_props(json!({ "title": title }))
        .into()
}

fn render_kind(result: CourierResult<Option<Vec<Segment>>>) -> RenderErrorKind {
    let err = result.expect_err("render should fail");
    match err.kind() {
        CourierErrorKind::Render(render) => render.kind.clone(),
        other => panic!("expected render error, got {}", other),
    }
}

#[test]
fn test_texts_keep_order_and_distinct_paths() {
    let tree = Node::fragment(vec!["one".into(), Node::fragment(vec!["two".into()]), "three".into()]);
    let segments = renderer().render(&tree).unwrap().unwrap();

    let texts: Vec<_> = segments.iter().filter_map(Segment::as_text).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);

    let paths: Vec<_> = segments.iter().map(|s| s.path().as_str()).collect();
    assert_eq!(paths, vec!["$[0]", "$[1][0]", "$[2]"]);
}

#[test]
fn test_empty_trees_render_to_none() {
    let renderer = renderer();
    assert!(renderer.render(&Node::Empty).unwrap().is_none());
    assert!(renderer.render(&Node::text("")).unwrap().is_none());
    let nested = Node::fragment(vec![Node::Empty, Node::fragment(vec![]), None::<Node>.into()]);
    assert!(renderer.render(&nested).unwrap().is_none());

    let bold_nothing = Node::general(GeneralTag::Bold, vec![Node::Empty]);
    assert!(renderer.render(&bold_nothing).unwrap().is_none());
}

#[test]
fn test_part_at_top_level_names_node_and_path() {
    let tree = Node::fragment(vec!["hi".into(), button("Yes")]);
    match render_kind(renderer().render(&tree)) {
        RenderErrorKind::PartAtTopLevel { node, path } => {
            assert_eq!(node, "<button>");
            assert_eq!(path, "$[1]#button");
        }
        other => panic!("unexpected error {}", other),
    }
}

#[test]
fn test_parts_combine_into_parent_unit() {
    let template = NativeElement::new("graph", "button_template")
        .with_children(vec!["Pick one".into()])
        .with_slot("buttons", Node::fragment(vec![button("A"), button("B")]));

    let segments = renderer().render(&template.into()).unwrap().unwrap();
    assert_eq!(segments.len(), 1);
    match segments[0].value() {
        SegmentValue::Unit(unit) => {
            assert_eq!(unit.value_type(), Some("template"));
            assert_eq!(unit.payload()["text"], json!("Pick one"));
            assert_eq!(unit.payload()["buttons"][1]["title"], json!("B"));
        }
        other => panic!("expected unit, got {:?}", other),
    }
}

#[test]
fn test_invalid_placement_names_offending_child() {
    let template = NativeElement::new("graph", "button_template")
        .with_slot("buttons", Node::fragment(vec![button("A"), "not a button".into()]));

    match render_kind(renderer().render(&template.into())) {
        RenderErrorKind::InvalidPlacement {
            node,
            path,
            expected,
            found,
        } => {
            assert_eq!(node, "\"not a button\"");
            assert_eq!(path, "$#button_template.buttons[1]");
            assert_eq!(expected, "part");
            assert_eq!(found, "text");
        }
        other => panic!("unexpected error {}", other),
    }
}

#[test]
fn test_unknown_component() {
    let tree: Node = NativeElement::new("graph", "carousel").into();
    assert!(matches!(
        render_kind(renderer().render(&tree)),
        RenderErrorKind::UnknownComponent { name, .. } if name == "carousel"
    ));
}

#[test]
fn test_native_element_of_other_platform() {
    let tree: Node = NativeElement::new("telegram", "button").into();
    assert!(matches!(
        render_kind(renderer().render(&tree)),
        RenderErrorKind::PlatformMismatch { element_platform, .. } if element_platform == "telegram"
    ));
}

#[test]
fn test_general_text_only_children() {
    let tree = Node::general(GeneralTag::Italic, vec![button("A")]);
    assert!(matches!(
        render_kind(renderer().render(&tree)),
        RenderErrorKind::InvalidPlacement { .. }
    ));
}

#[test]
fn test_paragraphs_and_breaks() {
    let tree = Node::fragment(vec![
        Node::general(GeneralTag::Paragraph, vec!["a".into(), Node::general(GeneralTag::Bold, vec!["b".into()])]),
        Node::general(GeneralTag::LineBreak, vec![]),
        Pause::new().into(),
        "c".into(),
    ]);
    let segments = renderer().render(&tree).unwrap().unwrap();
    let kinds: Vec<_> = segments.iter().map(Segment::kind).collect();
    assert_eq!(
        kinds,
        vec![
            SegmentKind::Text,
            SegmentKind::Break,
            SegmentKind::Break,
            SegmentKind::Pause,
            SegmentKind::Text,
        ]
    );
    assert_eq!(segments[0].as_text(), Some("ab"));
}

#[test]
fn test_function_components_expand() {
    let greeting = FunctionElement::new("Greeting", json!({ "name": "Ada" }), |props| {
        Ok(Node::fragment(vec![
            Node::text(format!("Hi {}", props["name"].as_str().unwrap_or_default())),
            button("Wave"),
        ]))
    });
    let template = NativeElement::new("graph", "button_template")
        .with_slot("buttons", greeting.clone().into());

    // the text inside the slot is misplaced
    assert!(renderer().render(&template.into()).is_err());

    let segments = render_plain_text(&renderer(), &FunctionElement::new("Plain", json!({}), |_| Ok("hello".into())).into()).unwrap();
    assert_eq!(segments, vec!["hello".to_string()]);

    let rendered = renderer().render(&Node::fragment(vec![greeting.into()]));
    assert!(matches!(render_kind(rendered), RenderErrorKind::PartAtTopLevel { path, .. } if path == "$[0]#Greeting[1]#button"));
}
