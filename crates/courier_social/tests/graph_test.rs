//! Graph API compilers through the dispatch engine, with a fake Graph worker.

use async_trait::async_trait;
use courier_core::{Job, JobResult, NativeElement, Node, Pause};
use courier_dispatch::{DispatchEngine, DispatchErrorKind, JobQueue};
use courier_interface::{ExecuteOutcome, Worker};
use courier_render::Renderer;
use courier_social::{
    GRAPH_PLATFORM, GraphChat, GraphChatCompiler, GraphChatOptions, GraphInteractCompiler,
    GraphPage, GraphPostCompiler, GraphThread, InteractResult, build_batch, graph_components,
    parse_batch_response,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Answers every job with a fresh id named after the endpoint it hit.
#[derive(Default)]
struct FakeGraph {
    batches: Mutex<Vec<Vec<Job>>>,
}

impl FakeGraph {
    fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl Worker for FakeGraph {
    async fn execute_jobs(&self, jobs: &[Job]) -> ExecuteOutcome {
        let mut batches = self.batches.lock().unwrap();
        let offset: usize = batches.iter().map(Vec::len).sum();
        let results = jobs
            .iter()
            .enumerate()
            .map(|(i, job)| {
                let kind = job.request.url.rsplit('/').next().unwrap_or("none");
                JobResult::ok(json!({ "id": format!("{}-{}", kind, offset + i) }))
            })
            .collect();
        batches.push(jobs.to_vec());
        ExecuteOutcome::Success(results)
    }
}

fn engine<T>(worker: Arc<FakeGraph>) -> DispatchEngine<T>
where
    T: courier_interface::DispatchTarget + Clone + 'static,
{
    DispatchEngine::new(Renderer::new(graph_components()), JobQueue::from_arc(worker))
}

fn element(name: &str) -> NativeElement {
    NativeElement::new(GRAPH_PLATFORM, name)
}

fn photo(url: &str) -> Node {
    element("photo").with_props(json!({ "url": url })).into()
}

#[tokio::test]
async fn test_post_attaches_uploaded_photos() {
    let worker = Arc::new(FakeGraph::default());
    let engine = engine::<GraphPage>(worker.clone());

    let content = Node::fragment(vec![
        element("post")
            .with_children(vec![Node::text("New menu")])
            .into(),
        photo("https://x/a.png"),
        photo("https://x/b.png"),
    ]);

    let response = engine
        .dispatch(GraphPage::new("PAGE"), &content, &GraphPostCompiler::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(worker.batch_sizes(), vec![2, 1]);
    let post = &response.jobs()[2];
    assert_eq!(post.request.url, "PAGE/feed");
    assert_eq!(
        post.request.params,
        json!({
            "message": "New menu",
            "attached_media": [{ "media_fbid": "photos-0" }, { "media_fbid": "photos-1" }],
        })
    );
    assert_eq!(response.results()[2].body["id"], "feed-2");
}

#[tokio::test]
async fn test_page_rejects_pause_before_sending() {
    let worker = Arc::new(FakeGraph::default());
    let engine = engine::<GraphPage>(worker.clone());

    let content = Node::fragment(vec![
        Node::text("one"),
        Node::Pause(Pause::new()),
        photo("https://x/a.png"),
    ]);
    let err = engine
        .dispatch(GraphPage::new("PAGE"), &content, &GraphPostCompiler::new())
        .await
        .unwrap_err();

    assert!(matches!(err.kind, DispatchErrorKind::Prepare(_)));
    assert!(worker.batch_sizes().is_empty());
}

#[tokio::test]
async fn test_interact_replies_to_new_comment() {
    let worker = Arc::new(FakeGraph::default());
    let engine = engine::<GraphThread>(worker.clone());

    let content = Node::fragment(vec![
        Node::text("Thanks!"),
        photo("https://x/a.png"),
        Node::text("See you"),
    ]);
    let response = engine
        .dispatch(
            GraphThread::new("PAGE", "POST_1"),
            &content,
            &GraphInteractCompiler::new(),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(worker.batch_sizes(), vec![1, 1, 1]);
    let urls: Vec<&str> = response
        .jobs()
        .iter()
        .map(|job| job.request.url.as_str())
        .collect();
    assert_eq!(urls, vec!["PAGE/photos", "POST_1/comments", "comments-1/comments"]);
    assert_eq!(response.jobs()[1].request.params["attachment_id"], "photos-0");

    let classified = InteractResult::classify(&response);
    assert_eq!(classified.photos, vec!["photos-0"]);
    assert_eq!(classified.comments, vec!["comments-1", "comments-2"]);
}

#[tokio::test]
async fn test_chat_messages_keep_order() {
    let worker = Arc::new(FakeGraph::default());
    let engine = engine::<GraphChat>(worker.clone());

    let content = Node::fragment(vec![
        Node::text("hello"),
        Node::Break,
        element("image")
            .with_props(json!({ "url": "https://x/a.png" }))
            .into(),
    ]);
    let compiler = GraphChatCompiler::new(GraphChatOptions::default().with_tag("ACCOUNT_UPDATE"));
    let response = engine
        .dispatch(GraphChat::new("PAGE", "USER"), &content, &compiler)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(worker.batch_sizes(), vec![2]);
    let jobs = response.jobs();
    assert_eq!(jobs[0].request.params["message"], json!({ "text": "hello" }));
    assert_eq!(jobs[1].request.params["message"]["attachment"]["type"], "image");
    assert!(jobs.iter().all(|job| job.request.params["tag"] == "ACCOUNT_UPDATE"));
}

#[test]
fn test_batch_items_carry_tokens() {
    let jobs = vec![
        Job::new(
            "PAGE",
            courier_core::Request::post("me/messages", json!({ "recipient": { "id": "U" } })),
        ),
        Job::new("PAGE", courier_core::Request::post("PAGE/feed", json!({ "message": "hi" }))),
    ];
    let mut tokens = HashMap::new();
    tokens.insert("PAGE".to_string(), "TOKEN".to_string());

    let batch = build_batch(&jobs, &tokens).unwrap();
    assert_eq!(
        batch,
        json!([
            {
                "method": "POST",
                "relative_url": "me/messages",
                "body": "recipient=%7B%22id%22%3A%22U%22%7D&access_token=TOKEN",
            },
            {
                "method": "POST",
                "relative_url": "PAGE/feed",
                "body": "message=hi&access_token=TOKEN",
            },
        ])
    );

    assert!(build_batch(&jobs, &HashMap::new()).is_err());
}

#[test]
fn test_batch_response_keeps_partial_results() {
    let jobs = vec![
        Job::new("PAGE", courier_core::Request::post("PAGE/photos", json!({}))),
        Job::new("PAGE", courier_core::Request::post("PAGE/feed", json!({}))),
        Job::new("PAGE", courier_core::Request::post("PAGE/feed", json!({}))),
    ];
    let response = json!([
        { "code": 200, "body": "{\"id\":\"PH\"}" },
        { "code": 400, "body": "{\"error\":{\"message\":\"Invalid parameter\"}}" },
        null,
    ]);

    let ExecuteOutcome::Failure { errors, results } = parse_batch_response(&jobs, &response) else {
        panic!("expected failure");
    };
    assert_eq!(results[0], Some(JobResult::ok(json!({ "id": "PH" }))));
    assert!(results[1].is_none());
    assert!(results[2].is_none());
    assert_eq!(errors.len(), 2);
    assert!(errors[0].to_string().contains("Invalid parameter"));
}

#[test]
fn test_batch_response_length_mismatch() {
    let jobs = vec![Job::new("PAGE", courier_core::Request::post("PAGE/feed", json!({})))];
    let outcome = parse_batch_response(&jobs, &json!([]));
    assert!(!outcome.is_success());
    assert!(outcome.is_retryable());
}
