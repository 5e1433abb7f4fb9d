//! Content tree construction tests.

use courier_core::{
    GeneralTag, NativeElement, Node, Pause, Segment, SegmentKind, SegmentValue, UnitValue,
};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use strum::IntoEnumIterator;

#[test]
fn test_conversions_build_fragments() {
    let node: Node = vec![Node::text("a"), "b".into(), String::from("c").into()].into();
    match node {
        Node::Fragment(children) => {
            assert_eq!(children.len(), 3);
            assert!(children.iter().all(|c| matches!(c, Node::Text(_))));
        }
        other => panic!("expected fragment, got {:?}", other),
    }
}

#[test]
fn test_none_converts_to_empty() {
    let node: Node = None::<Node>.into();
    assert!(matches!(node, Node::Empty));
}

#[test]
fn test_pause_converts_to_node() {
    let node: Node = Pause::new().with_delay(Duration::from_secs(1)).into();
    assert_eq!(node.describe(), "<Pause />");
}

#[test]
fn test_native_element_props() {
    let element = NativeElement::new("graph", "image")
        .with_props(json!({ "url": "https://example.com/a.png", "reusable": true }))
        .with_children(vec![Node::text("ignored")]);

    assert_eq!(element.platform(), "graph");
    assert_eq!(element.prop_str("url"), Some("https://example.com/a.png"));
    assert_eq!(element.prop_str("reusable"), None);
    assert_eq!(element.children().len(), 1);
}

#[test]
fn test_general_tag_names() {
    assert_eq!(GeneralTag::Paragraph.to_string(), "p");
    assert_eq!(GeneralTag::LineBreak.to_string(), "br");

    let names: Vec<String> = GeneralTag::iter().map(|tag| tag.to_string()).collect();
    assert_eq!(names, vec!["p", "b", "i", "s", "code", "br"]);
}

#[test]
fn test_segment_kinds() {
    let text = Segment::text("hi", "\"hi\"", "$");
    assert_eq!(text.kind(), SegmentKind::Text);
    assert_eq!(text.as_text(), Some("hi"));

    let unit = Segment::unit(UnitValue::new(json!({ "type": "photo" })), "<photo>", "$[1]");
    assert_eq!(unit.kind(), SegmentKind::Unit);
    assert!(unit.as_text().is_none());
    assert!(matches!(unit.into_value(), SegmentValue::Unit(_)));

    assert_eq!(Segment::break_("<Break />", "$[2]").kind().to_string(), "break");
}

#[test]
fn test_segment_kind_names_are_distinct() {
    let names: HashSet<String> = SegmentKind::iter().map(|kind| kind.to_string()).collect();
    assert_eq!(names.len(), SegmentKind::iter().count());
    assert!(names.contains("thunk"));
}
