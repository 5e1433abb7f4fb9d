//! Dispatch engine behavior tests with a recording worker.

use async_trait::async_trait;
use courier_core::{
    ConsumeResult, DispatchResponse, Job, JobResult, Node, Pause, Request, Segment, TaskSummary,
    Thunk,
};
use courier_dispatch::{
    DispatchEngine, DispatchError, DispatchErrorKind, DispatchFrame, DispatchMiddleware,
    DispatchOutcome, JobQueue, Next,
};
use courier_error::{
    CompileError, CompileErrorKind, CourierResult, ExecutionError, ExecutionErrorKind,
};
use courier_interface::{DispatchTarget, ExecuteOutcome, JobCompiler, Worker};
use courier_rate_limit::DispatchConfig;
use courier_render::{ComponentRegistry, Renderer};
use serde_json::{Value as JsonValue, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Chat {
    id: String,
    allow_pause: bool,
}

impl Chat {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            allow_pause: true,
        }
    }
}

impl DispatchTarget for Chat {
    fn platform(&self) -> &str {
        "test"
    }

    fn uid(&self) -> String {
        format!("chat:{}", self.id)
    }

    fn allow_pause(&self) -> bool {
        self.allow_pause
    }
}

/// One job per text segment; `photo:<name>` registers, `post` consumes the photos of its batch.
struct TextCompiler;

impl JobCompiler<Chat> for TextCompiler {
    fn compile(&self, target: &Chat, segments: Vec<Segment>) -> CourierResult<Vec<Job>> {
        let mut jobs = Vec::new();
        let mut photos = Vec::new();

        for segment in segments {
            let text = match segment.as_text() {
                Some(text) if text != "bad" => text.to_string(),
                _ => {
                    return Err(CompileError::new(CompileErrorKind::InvalidSegment {
                        node: segment.node().clone(),
                        path: segment.path().clone(),
                        target: target.uid(),
                        reason: "only text is supported".to_string(),
                    })
                    .into());
                }
            };

            let mut job = Job::new(target.uid(), Request::post("me/messages", json!({ "text": text })))
                .with_key(target.uid());
            if let Some(name) = text.strip_prefix("photo:") {
                photos.push(name.to_string());
                job = job.with_register_result(name);
            } else if text == "post" && !photos.is_empty() {
                job = job.with_consume_result(ConsumeResult::new(
                    std::mem::take(&mut photos),
                    |request, keys, results| {
                        let ids = keys
                            .iter()
                            .map(|key| results.lookup(key, "$.id"))
                            .collect::<CourierResult<Vec<_>>>()?;
                        let mut request = request.clone();
                        request.set_param("attached_media", JsonValue::Array(ids));
                        Ok(request)
                    },
                ));
            }
            jobs.push(job);
        }
        Ok(jobs)
    }
}

/// Records every batch and fails the job whose text is `fail`.
#[derive(Default)]
struct RecordingWorker {
    batches: Mutex<Vec<Vec<JsonValue>>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingWorker {
    fn with_log(log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            log,
        }
    }

    fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    fn sent(&self) -> usize {
        self.batches.lock().unwrap().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl Worker for RecordingWorker {
    async fn execute_jobs(&self, jobs: &[Job]) -> ExecuteOutcome {
        let offset = self.sent();
        self.batches
            .lock()
            .unwrap()
            .push(jobs.iter().map(|j| j.request.params.clone()).collect());

        let mut results = Vec::new();
        for (index, job) in jobs.iter().enumerate() {
            let text = job.request.params["text"].as_str().unwrap_or_default().to_string();
            if text == "fail" {
                results.resize(jobs.len(), None);
                return ExecuteOutcome::Failure {
                    errors: vec![ExecutionError::new(ExecutionErrorKind::Api {
                        code: 400,
                        url: job.request.url.clone(),
                        message: "bad request".to_string(),
                    })],
                    results,
                };
            }
            self.log.lock().unwrap().push(format!("send:{}", text));
            results.push(Some(JobResult::ok(json!({ "id": format!("id-{}", offset + index) }))));
        }
        ExecuteOutcome::Success(results.into_iter().flatten().collect())
    }
}

fn engine(worker: Arc<RecordingWorker>) -> DispatchEngine<Chat> {
    let renderer = Renderer::new(ComponentRegistry::new("test"));
    DispatchEngine::new(renderer, JobQueue::from_arc(worker))
}

fn texts(response: &DispatchResponse<Chat>) -> Vec<String> {
    response
        .jobs()
        .iter()
        .map(|j| j.request.params["text"].as_str().unwrap().to_string())
        .collect()
}

fn content(items: Vec<Node>) -> Node {
    Node::fragment(items)
}

#[tokio::test]
async fn test_empty_content_never_reaches_worker() {
    let worker = Arc::new(RecordingWorker::default());
    let engine = engine(worker.clone());

    let tree = content(vec![Node::Empty, "".into()]);
    let response = engine.dispatch(Chat::new("1"), &tree, &TextCompiler).await.unwrap();

    assert!(response.is_none());
    assert!(worker.batch_sizes().is_empty());
}

#[tokio::test]
async fn test_jobs_keep_render_order() {
    let worker = Arc::new(RecordingWorker::default());
    let engine = engine(worker.clone());

    let tree = content(vec!["a".into(), "b".into(), "c".into()]);
    let response = engine
        .dispatch(Chat::new("1"), &tree, &TextCompiler)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(texts(&response), vec!["a", "b", "c"]);
    assert_eq!(response.results().len(), 3);
    assert_eq!(response.results()[2].body, json!({ "id": "id-2" }));
    assert_eq!(response.platform(), "test");
    assert_eq!(worker.batch_sizes(), vec![3]);
}

#[tokio::test]
async fn test_breaks_do_not_split_batches() {
    let worker = Arc::new(RecordingWorker::default());
    let engine = engine(worker.clone());

    let tree = content(vec!["a".into(), Node::Break, "b".into()]);
    let response = engine
        .dispatch(Chat::new("1"), &tree, &TextCompiler)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(response.tasks(), &vec![TaskSummary::Dispatch(2)]);
    assert_eq!(worker.batch_sizes(), vec![2]);
}

#[tokio::test]
async fn test_pause_runs_between_batches() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let worker = Arc::new(RecordingWorker::with_log(log.clone()));
    let engine = engine(worker.clone());

    let pause_log = log.clone();
    let pause = Pause::new()
        .with_delay(Duration::from_millis(5))
        .with_after(move || {
            let log = pause_log.clone();
            async move {
                log.lock().unwrap().push("pause".to_string());
                Ok(())
            }
        });

    let tree = content(vec!["a".into(), pause.into(), "b".into()]);
    let response = engine
        .dispatch(Chat::new("1"), &tree, &TextCompiler)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        response.tasks(),
        &vec![TaskSummary::Dispatch(1), TaskSummary::Pause, TaskSummary::Dispatch(1)]
    );
    assert_eq!(*log.lock().unwrap(), vec!["send:a", "pause", "send:b"]);
}

#[tokio::test]
async fn test_thunk_runs_in_sequence() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let worker = Arc::new(RecordingWorker::with_log(log.clone()));
    let engine = engine(worker.clone());

    let thunk_log = log.clone();
    let thunk = Thunk::new(move || {
        let log = thunk_log.clone();
        async move {
            log.lock().unwrap().push("thunk".to_string());
            Ok(())
        }
    });

    let tree = content(vec!["a".into(), thunk.into(), "b".into()]);
    engine
        .dispatch(Chat::new("1"), &tree, &TextCompiler)
        .await
        .unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["send:a", "thunk", "send:b"]);
}

#[tokio::test]
async fn test_pause_rejected_before_sending() {
    let worker = Arc::new(RecordingWorker::default());
    let engine = engine(worker.clone());
    let target = Chat {
        id: "1".to_string(),
        allow_pause: false,
    };

    let tree = content(vec!["a".into(), Pause::new().into(), "b".into()]);
    let err = engine.dispatch(target, &tree, &TextCompiler).await.unwrap_err();

    assert!(matches!(err.kind, DispatchErrorKind::Prepare(_)));
    assert!(worker.batch_sizes().is_empty());
}

#[tokio::test]
async fn test_compile_error_surfaces_before_sending() {
    let worker = Arc::new(RecordingWorker::default());
    let engine = engine(worker.clone());

    let tree = content(vec!["a".into(), "bad".into()]);
    let err = engine.dispatch(Chat::new("1"), &tree, &TextCompiler).await.unwrap_err();

    assert!(matches!(err.kind, DispatchErrorKind::Prepare(_)));
    assert!(err.to_string().contains("only text is supported"));
    assert!(worker.batch_sizes().is_empty());
}

#[tokio::test]
async fn test_chained_results_fill_consumer() {
    let worker = Arc::new(RecordingWorker::default());
    let engine = engine(worker.clone());

    let tree = content(vec!["photo:a".into(), "photo:b".into(), "post".into()]);
    let response = engine
        .dispatch(Chat::new("1"), &tree, &TextCompiler)
        .await
        .unwrap()
        .unwrap();

    // Consumer is held back until the photos it references are uploaded
    assert_eq!(worker.batch_sizes(), vec![2, 1]);
    assert_eq!(
        response.jobs()[2].request.params["attached_media"],
        json!(["id-0", "id-1"])
    );
}

#[tokio::test]
async fn test_failure_stops_dispatch_with_partial_results() {
    let worker = Arc::new(RecordingWorker::default());
    let engine = engine(worker.clone()).with_config(DispatchConfig {
        max_batch_size: 1,
        ..DispatchConfig::default()
    });

    let tree = content(vec!["a".into(), "fail".into(), "c".into()]);
    let err = engine.dispatch(Chat::new("1"), &tree, &TextCompiler).await.unwrap_err();

    assert!(matches!(
        err.kind,
        DispatchErrorKind::Execution { failed: 1, total: 3 }
    ));
    assert_eq!(err.jobs.len(), 3);
    assert!(err.results[0].is_some());
    assert!(err.results[1].is_none());
    assert!(err.results[2].is_none());
    assert_eq!(err.succeeded().count(), 1);
    assert_eq!(err.errors.len(), 1);
    assert_eq!(worker.batch_sizes(), vec![1, 1]);
}

#[tokio::test]
async fn test_failure_mid_batch_skips_later_batches() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let worker = Arc::new(RecordingWorker::with_log(log.clone()));
    let engine = engine(worker.clone());

    let pause_log = log.clone();
    let pause = Pause::new().with_after(move || {
        let log = pause_log.clone();
        async move {
            log.lock().unwrap().push("pause".to_string());
            Ok(())
        }
    });
    let tree = content(vec!["a".into(), "fail".into(), "c".into(), pause.into(), "d".into()]);
    let err = engine.dispatch(Chat::new("1"), &tree, &TextCompiler).await.unwrap_err();

    // Only the failed job counts; "c" was never attempted
    assert!(matches!(
        err.kind,
        DispatchErrorKind::Execution { failed: 1, total: 4 }
    ));
    assert_eq!(err.jobs.len(), 4);
    let known: Vec<bool> = err.results.iter().map(Option::is_some).collect();
    assert_eq!(known, vec![true, false, false, false]);
    assert_eq!(worker.batch_sizes(), vec![3]);
    assert_eq!(*log.lock().unwrap(), vec!["send:a".to_string()]);
}

#[tokio::test]
async fn test_batches_split_at_max_size() {
    let worker = Arc::new(RecordingWorker::default());
    let engine = engine(worker.clone()).with_config(DispatchConfig {
        max_batch_size: 2,
        ..DispatchConfig::default()
    });

    let tree = content(vec!["a".into(), "b".into(), "c".into()]);
    let response = engine
        .dispatch(Chat::new("1"), &tree, &TextCompiler)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(worker.batch_sizes(), vec![2, 1]);
    assert_eq!(texts(&response), vec!["a", "b", "c"]);
}

/// Answers without executing anything.
struct Bypass;

#[async_trait]
impl DispatchMiddleware<Chat> for Bypass {
    async fn handle(&self, frame: DispatchFrame<Chat>, _next: Next<'_, Chat>) -> DispatchOutcome<Chat> {
        Ok(DispatchResponse::new(frame.platform, frame.target, Vec::new(), Vec::new(), Vec::new()))
    }
}

/// Turns execution failures into the partial response.
struct Recover;

#[async_trait]
impl DispatchMiddleware<Chat> for Recover {
    async fn handle(&self, frame: DispatchFrame<Chat>, next: Next<'_, Chat>) -> DispatchOutcome<Chat> {
        let platform = frame.platform.clone();
        let target = frame.target.clone();
        next.run(frame).await.or_else(|err: DispatchError| {
            let (jobs, results): (Vec<_>, Vec<_>) =
                err.succeeded().map(|(j, r)| (j.clone(), r.clone())).unzip();
            Ok(DispatchResponse::new(platform, target, jobs, results, Vec::new()))
        })
    }
}

/// Records entry and exit around the rest of the chain.
struct Trace {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl DispatchMiddleware<Chat> for Trace {
    async fn handle(&self, frame: DispatchFrame<Chat>, next: Next<'_, Chat>) -> DispatchOutcome<Chat> {
        self.log.lock().unwrap().push(format!("{}:in", self.name));
        let outcome = next.run(frame).await;
        self.log.lock().unwrap().push(format!("{}:out", self.name));
        outcome
    }
}

#[tokio::test]
async fn test_middleware_can_bypass_execution() {
    let worker = Arc::new(RecordingWorker::default());
    let engine = engine(worker.clone()).with_middleware(Bypass);

    let tree = content(vec!["a".into()]);
    let response = engine
        .dispatch(Chat::new("1"), &tree, &TextCompiler)
        .await
        .unwrap()
        .unwrap();

    assert!(response.jobs().is_empty());
    assert!(worker.batch_sizes().is_empty());
}

#[tokio::test]
async fn test_middleware_can_recover_errors() {
    let worker = Arc::new(RecordingWorker::default());
    let engine = engine(worker.clone()).with_middleware(Recover);

    let tree = content(vec!["a".into(), "fail".into()]);
    let response = engine
        .dispatch(Chat::new("1"), &tree, &TextCompiler)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(texts(&response), vec!["a"]);
}

#[tokio::test]
async fn test_middlewares_wrap_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let worker = Arc::new(RecordingWorker::with_log(log.clone()));
    let engine = engine(worker)
        .with_middleware(Trace {
            name: "outer",
            log: log.clone(),
        })
        .with_middleware(Trace {
            name: "inner",
            log: log.clone(),
        });

    let tree = content(vec!["a".into()]);
    engine
        .dispatch(Chat::new("1"), &tree, &TextCompiler)
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["outer:in", "inner:in", "send:a", "inner:out", "outer:out"]
    );
}

/// Logs the start and end of every batch, sleeping in between.
struct SlowWorker {
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Worker for SlowWorker {
    async fn execute_jobs(&self, jobs: &[Job]) -> ExecuteOutcome {
        let name = jobs[0].request.params["text"].as_str().unwrap_or_default().to_string();
        self.log.lock().unwrap().push(format!("start:{}", name));
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.log.lock().unwrap().push(format!("end:{}", name));
        ExecuteOutcome::Success(jobs.iter().map(|_| JobResult::ok(json!({}))).collect())
    }
}

#[tokio::test]
async fn test_queue_serializes_batches_sharing_a_key() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let queue = JobQueue::new(SlowWorker { log: log.clone() });

    let job = |text: &str| {
        Job::new("c", Request::post("me/messages", json!({ "text": text }))).with_key("chat:1")
    };
    let first = [job("1")];
    let second = [job("2")];

    let (a, b) = tokio::join!(queue.execute_jobs(&first), queue.execute_jobs(&second));

    assert!(a.is_success() && b.is_success());
    assert_eq!(*log.lock().unwrap(), vec!["start:1", "end:1", "start:2", "end:2"]);
    assert_eq!(queue.pending_keys(), 0);
}
