//! The dispatch engine.

use crate::{
    DispatchError, DispatchErrorKind, DispatchFrame, DispatchMiddleware, DispatchOutcome,
    DispatchTask, FrameExecutor, JobQueue, Next, ResultRegistry, build_tasks, split_waves,
    validate_chaining,
};
use async_trait::async_trait;
use courier_core::{DispatchResponse, Job, JobResult, Node};
use courier_error::{ExecutionError, ExecutionErrorKind};
use courier_interface::{DispatchTarget, ExecuteOutcome, JobCompiler, Worker};
use courier_rate_limit::DispatchConfig;
use courier_render::Renderer;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Renders content, compiles it into jobs and executes them in order.
///
/// One engine serves one platform and one target type. Dispatches may run
/// concurrently; jobs sharing an ordering key are serialized by the queue.
///
/// # Example
///
/// ```rust,ignore
/// let engine = DispatchEngine::new(renderer, JobQueue::new(worker))
///     .with_middleware(AuditMiddleware);
///
/// if let Some(response) = engine.dispatch(chat, &content, &TelegramChatCompiler::new()).await? {
///     println!("sent {} jobs", response.jobs().len());
/// }
/// ```
pub struct DispatchEngine<T>
where
    T: DispatchTarget + Clone + 'static,
{
    renderer: Renderer,
    queue: JobQueue,
    middlewares: Vec<Arc<dyn DispatchMiddleware<T>>>,
    config: DispatchConfig,
}

impl<T> DispatchEngine<T>
where
    T: DispatchTarget + Clone + 'static,
{
    /// Engine for the renderer's platform, sending through `queue`.
    pub fn new(renderer: Renderer, queue: JobQueue) -> Self {
        Self {
            renderer,
            queue,
            middlewares: Vec::new(),
            config: DispatchConfig::default(),
        }
    }

    /// Append a middleware; the first one added is the outermost.
    pub fn with_middleware(mut self, middleware: impl DispatchMiddleware<T> + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Use batching settings from configuration.
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Platform of the engine.
    pub fn platform(&self) -> &str {
        self.renderer.platform()
    }

    /// The renderer used for content trees.
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Render `node`, compile it for `target` and execute the jobs.
    ///
    /// Returns `Ok(None)` when the content renders to nothing; the worker is
    /// not touched in that case.
    ///
    /// # Errors
    ///
    /// Render and compile failures are returned before anything is sent. A
    /// failure while executing stops the dispatch: later tasks are not run and
    /// the error carries the results of the jobs that did complete.
    #[instrument(skip_all, fields(platform = %self.platform(), target = %target.uid()))]
    pub async fn dispatch<C>(
        &self,
        target: T,
        node: &Node,
        compiler: &C,
    ) -> Result<Option<DispatchResponse<T>>, DispatchError>
    where
        C: JobCompiler<T> + ?Sized,
    {
        let segments = match self.renderer.render(node) {
            Ok(Some(segments)) => segments,
            Ok(None) => {
                debug!("Nothing to dispatch");
                return Ok(None);
            }
            Err(e) => return Err(DispatchError::prepare(e)),
        };

        let tasks = build_tasks(&target, segments, compiler).map_err(DispatchError::prepare)?;
        validate_chaining(&tasks).map_err(DispatchError::prepare)?;

        self.dispatch_tasks(target, tasks).await.map(Some)
    }

    /// Run already compiled tasks through the middleware chain.
    pub async fn dispatch_tasks(&self, target: T, tasks: Vec<DispatchTask>) -> DispatchOutcome<T> {
        let frame = DispatchFrame {
            platform: self.platform().to_string(),
            target,
            tasks,
        };
        let executor = TaskRunner {
            queue: &self.queue,
            max_batch_size: self.config.max_batch_size.max(1),
        };

        let outcome = Next::new(&self.middlewares, &executor).run(frame).await;
        match &outcome {
            Ok(response) => info!(jobs = response.jobs().len(), "Dispatch complete"),
            Err(e) => error!(error = %e, "Dispatch failed"),
        }
        outcome
    }
}

impl<T> std::fmt::Debug for DispatchEngine<T>
where
    T: DispatchTarget + Clone + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("platform", &self.platform())
            .field("middlewares", &self.middlewares.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Executes tasks one after another, tracking results for chaining.
struct TaskRunner<'a> {
    queue: &'a JobQueue,
    max_batch_size: usize,
}

/// Jobs and result slots of one dispatch in send order.
struct Progress {
    jobs: Vec<Job>,
    results: Vec<Option<JobResult>>,
    sent: usize,
}

#[async_trait]
impl<T> FrameExecutor<T> for TaskRunner<'_>
where
    T: DispatchTarget + Clone + 'static,
{
    async fn execute(&self, frame: DispatchFrame<T>) -> DispatchOutcome<T> {
        let DispatchFrame {
            platform,
            target,
            tasks,
        } = frame;

        let jobs: Vec<Job> = tasks.iter().flat_map(|t| t.jobs().iter().cloned()).collect();
        let mut progress = Progress {
            results: vec![None; jobs.len()],
            jobs,
            sent: 0,
        };
        let mut registry = ResultRegistry::new();
        let summaries = tasks.iter().map(DispatchTask::summary).collect();

        for task in tasks {
            match task {
                DispatchTask::Pause(pause) => {
                    debug!(delay = ?pause.delay(), "Pausing");
                    if let Err(e) = pause.wait().await {
                        return Err(progress_error(&progress, DispatchErrorKind::Pause(e)));
                    }
                }
                DispatchTask::Thunk(thunk) => {
                    if let Err(e) = thunk.run().await {
                        return Err(progress_error(&progress, DispatchErrorKind::Thunk(e)));
                    }
                }
                DispatchTask::Dispatch(jobs) => {
                    for wave in split_waves(jobs) {
                        let wave = match wave
                            .into_iter()
                            .map(|job| registry.accomplish(job))
                            .collect::<Result<Vec<_>, _>>()
                        {
                            Ok(wave) => wave,
                            Err(e) => {
                                return Err(progress_error(
                                    &progress,
                                    DispatchErrorKind::Chaining(e),
                                ));
                            }
                        };

                        for chunk in wave.chunks(self.max_batch_size) {
                            self.execute_chunk(chunk, &mut progress, &mut registry).await?;
                        }
                    }
                }
            }
        }

        let Progress { jobs, results, .. } = progress;
        let results = results.into_iter().flatten().collect();
        Ok(DispatchResponse::new(platform, target, jobs, results, summaries))
    }
}

impl TaskRunner<'_> {
    async fn execute_chunk(
        &self,
        chunk: &[Job],
        progress: &mut Progress,
        registry: &mut ResultRegistry,
    ) -> Result<(), DispatchError> {
        let offset = progress.sent;
        progress.jobs[offset..offset + chunk.len()].clone_from_slice(chunk);
        progress.sent += chunk.len();
        debug!(offset, jobs = chunk.len(), "Executing batch");

        let (errors, partial) = match self.queue.execute_jobs(chunk).await {
            ExecuteOutcome::Success(results) if results.len() == chunk.len() => {
                for (index, (job, result)) in chunk.iter().zip(results).enumerate() {
                    if let Err(e) = registry.register(job, &result) {
                        progress.results[offset + index] = Some(result);
                        return Err(progress_error(progress, DispatchErrorKind::Chaining(e)));
                    }
                    progress.results[offset + index] = Some(result);
                }
                return Ok(());
            }
            ExecuteOutcome::Success(results) => {
                let message = format!(
                    "worker returned {} results for {} jobs",
                    results.len(),
                    chunk.len()
                );
                warn!("{}", message);
                (
                    vec![ExecutionError::new(ExecutionErrorKind::Transport(message))],
                    vec![None; chunk.len()],
                )
            }
            ExecuteOutcome::Failure { errors, results } => (errors, results),
        };

        for (index, result) in partial.into_iter().take(chunk.len()).enumerate() {
            progress.results[offset + index] = result;
        }
        // Slots after the failing job are unknown, not failed
        let unknown = progress.results[offset..offset + chunk.len()]
            .iter()
            .filter(|r| r.is_none())
            .count();
        let failed = errors.len().min(unknown);
        let total = progress.jobs.len();
        Err(
            progress_error(progress, DispatchErrorKind::Execution { failed, total })
                .with_errors(errors),
        )
    }
}

#[track_caller]
fn progress_error(progress: &Progress, kind: DispatchErrorKind) -> DispatchError {
    DispatchError::new(kind).with_jobs(progress.jobs.clone(), progress.results.clone())
}
