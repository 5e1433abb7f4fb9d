//! Script runtime persistence tests.

use courier_core::Node;
use courier_error::CourierErrorKind;
use courier_script::{
    STATE_KEY, Script, ScriptLibrary, ScriptNode, ScriptProcessor, ScriptStateRecord, StartOptions,
};
use courier_storage::{InMemoryStateStore, StateStore};
use serde_json::json;
use std::sync::Arc;

fn library() -> ScriptLibrary {
    let quiz = Arc::new(
        Script::build(
            "quiz",
            vec![
                ScriptNode::content(|_| "2 + 2?".into()),
                ScriptNode::prompt("ANSWER")
                    .with_set_vars(|c, input| {
                        let mut vars = c.vars.clone();
                        vars["answer"] = input.clone();
                        vars
                    })
                    .into(),
                ScriptNode::return_value(|c| c.vars["answer"].clone()),
            ],
        )
        .unwrap(),
    );
    let onboarding = Arc::new(
        Script::build(
            "onboarding",
            vec![
                ScriptNode::content(|c| format!("hello {}", c.channel).into()),
                ScriptNode::call("QUIZ", quiz)
                    .with_set_vars(|_, value| json!({ "score": value }))
                    .into(),
                ScriptNode::content(|c| format!("score {}", c.vars["score"]).into()),
            ],
        )
        .unwrap(),
    );

    let mut library = ScriptLibrary::new();
    library.register(onboarding).unwrap();
    library
}

fn processor(store: Arc<InMemoryStateStore>) -> ScriptProcessor<InMemoryStateStore> {
    ScriptProcessor::new("test", store, library())
}

fn text(node: &Node) -> String {
    match node {
        Node::Text(text) => text.clone(),
        other => other.describe(),
    }
}

fn is_conflict(err: &courier_error::CourierError) -> bool {
    matches!(err.kind(), CourierErrorKind::State(state) if state.is_conflict())
}

#[test]
fn test_library_registers_callees() {
    let library = library();
    assert_eq!(library.names(), vec!["onboarding", "quiz"]);
    assert!(library.get("missing").is_err());
}

#[test]
fn test_library_rejects_name_clash() {
    let mut library = library();
    let clash = Arc::new(Script::build("quiz", vec![]).unwrap());
    assert!(library.register(clash).is_err());
}

#[tokio::test]
async fn test_runtime_suspends_persists_and_resumes() {
    let store = Arc::new(InMemoryStateStore::new());
    let processor = processor(store.clone());

    let mut runtime = processor
        .start("test.1", "onboarding", StartOptions::default())
        .await
        .unwrap();
    let first = runtime.run(None).await.unwrap();

    assert!(!first.finished);
    let texts: Vec<_> = first.content.iter().map(text).collect();
    assert_eq!(texts, vec!["hello test.1", "2 + 2?"]);
    assert!(runtime.save().await.unwrap());

    let stored = store.get("test.1", STATE_KEY).await.unwrap().unwrap();
    let record = ScriptStateRecord::from_value("test.1", stored).unwrap();
    let stops: Vec<_> = record
        .call_stack
        .iter()
        .map(|f| (f.name.as_str(), f.stop_at.as_deref()))
        .collect();
    assert_eq!(stops, vec![("onboarding", Some("QUIZ")), ("quiz", Some("ANSWER"))]);

    let mut resumed = processor.continue_channel("test.1").await.unwrap().unwrap();
    let second = resumed.run(Some(&json!(4))).await.unwrap();

    assert!(second.finished);
    assert_eq!(second.content.iter().map(text).collect::<Vec<_>>(), vec!["score 4"]);
    assert!(!resumed.save().await.unwrap());
    assert!(store.get("test.1", STATE_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_start_conflicts_with_existing_state() {
    let store = Arc::new(InMemoryStateStore::new());
    let processor = processor(store);

    let mut runtime = processor
        .start("test.1", "onboarding", StartOptions::default())
        .await
        .unwrap();
    runtime.run(None).await.unwrap();
    runtime.save().await.unwrap();

    let err = processor
        .start("test.1", "onboarding", StartOptions::default())
        .await
        .err()
        .unwrap();
    assert!(is_conflict(&err));
}

#[tokio::test]
async fn test_stale_save_is_a_conflict() {
    let store = Arc::new(InMemoryStateStore::new());
    let processor = processor(store);

    let mut runtime = processor
        .start("test.1", "onboarding", StartOptions::default())
        .await
        .unwrap();
    runtime.run(None).await.unwrap();
    runtime.save().await.unwrap();

    let mut first = processor.continue_channel("test.1").await.unwrap().unwrap();
    let mut second = processor.continue_channel("test.1").await.unwrap().unwrap();

    first.run(Some(&json!("wrong"))).await.unwrap();
    first.save().await.unwrap();

    second.run(Some(&json!(4))).await.unwrap();
    let err = second.save().await.unwrap_err();
    assert!(is_conflict(&err));
}

#[tokio::test]
async fn test_finished_runtime_cannot_run_again() {
    let store = Arc::new(InMemoryStateStore::new());
    let processor = processor(store);

    let mut runtime = processor
        .start("test.1", "quiz", StartOptions::default().with_goto("ANSWER"))
        .await
        .unwrap();
    // Starting at the prompt label suspends immediately
    let first = runtime.run(None).await.unwrap();
    assert!(!first.finished);

    runtime.save().await.unwrap();
    let mut resumed = processor.continue_channel("test.1").await.unwrap().unwrap();
    let done = resumed.run(Some(&json!(4))).await.unwrap();
    assert!(done.finished);
    assert_eq!(resumed.return_value(), Some(&json!(4)));
    assert!(resumed.run(None).await.is_err());
}

#[tokio::test]
async fn test_unknown_script_and_label() {
    let store = Arc::new(InMemoryStateStore::new());
    let processor = processor(store);

    assert!(processor.start("test.1", "missing", StartOptions::default()).await.is_err());
    assert!(
        processor
            .start("test.1", "quiz", StartOptions::default().with_goto("NOPE"))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_abort_deletes_state() {
    let store = Arc::new(InMemoryStateStore::new());
    let processor = processor(store);

    let mut runtime = processor
        .start("test.1", "onboarding", StartOptions::default())
        .await
        .unwrap();
    runtime.run(None).await.unwrap();
    runtime.save().await.unwrap();

    assert!(processor.abort("test.1").await.unwrap());
    assert!(processor.continue_channel("test.1").await.unwrap().is_none());
    assert!(!processor.abort("test.1").await.unwrap());
}

#[tokio::test]
async fn test_corrupted_record_is_reported() {
    let store = Arc::new(InMemoryStateStore::new());
    store
        .set("test.1", STATE_KEY, json!({ "version": "99", "timestamp": 1, "call_stack": [] }))
        .await
        .unwrap();
    let processor = processor(store);

    let err = processor.continue_channel("test.1").await.err().unwrap();
    assert!(err.to_string().contains("unsupported version"));
}
