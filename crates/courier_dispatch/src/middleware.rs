//! Dispatch middleware chain.
//!
//! Middlewares wrap task execution in registration order: the first
//! middleware sees the frame first and the response last. Each one decides
//! whether to call [`Next::run`] and may replace the frame, the response or
//! the error.

use crate::{DispatchError, DispatchTask};
use async_trait::async_trait;
use courier_core::DispatchResponse;
use courier_interface::DispatchTarget;

/// Result of running a dispatch frame.
pub type DispatchOutcome<T> = Result<DispatchResponse<T>, DispatchError>;

/// Everything a dispatch is about to execute.
#[derive(Debug, Clone)]
pub struct DispatchFrame<T> {
    /// Platform of the dispatch
    pub platform: String,
    /// Destination of the content
    pub target: T,
    /// Tasks in execution order
    pub tasks: Vec<DispatchTask>,
}

impl<T> DispatchFrame<T> {
    /// Number of jobs across all tasks.
    pub fn job_count(&self) -> usize {
        self.tasks.iter().map(|t| t.jobs().len()).sum()
    }
}

/// A layer around dispatch execution.
///
/// # Example
///
/// ```rust,ignore
/// struct Audit;
///
/// #[async_trait]
/// impl<T: DispatchTarget + Clone + 'static> DispatchMiddleware<T> for Audit {
///     async fn handle(&self, frame: DispatchFrame<T>, next: Next<'_, T>) -> DispatchOutcome<T> {
///         let response = next.run(frame).await?;
///         tracing::info!(jobs = response.jobs().len(), "Delivered");
///         Ok(response)
///     }
/// }
/// ```
#[async_trait]
pub trait DispatchMiddleware<T>: Send + Sync
where
    T: DispatchTarget + Clone + 'static,
{
    /// Handle a frame, usually by delegating to `next`.
    async fn handle(&self, frame: DispatchFrame<T>, next: Next<'_, T>) -> DispatchOutcome<T>;
}

/// Innermost step of the chain, executing the tasks.
#[async_trait]
pub(crate) trait FrameExecutor<T>: Send + Sync
where
    T: DispatchTarget + Clone + 'static,
{
    async fn execute(&self, frame: DispatchFrame<T>) -> DispatchOutcome<T>;
}

/// The remainder of the middleware chain.
///
/// `Next` is `Copy`; a middleware may run it zero or more times.
pub struct Next<'a, T>
where
    T: DispatchTarget + Clone + 'static,
{
    middlewares: &'a [std::sync::Arc<dyn DispatchMiddleware<T>>],
    executor: &'a dyn FrameExecutor<T>,
}

impl<T> Clone for Next<'_, T>
where
    T: DispatchTarget + Clone + 'static,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Next<'_, T> where T: DispatchTarget + Clone + 'static {}

impl<'a, T> Next<'a, T>
where
    T: DispatchTarget + Clone + 'static,
{
    pub(crate) fn new(
        middlewares: &'a [std::sync::Arc<dyn DispatchMiddleware<T>>],
        executor: &'a dyn FrameExecutor<T>,
    ) -> Self {
        Self {
            middlewares,
            executor,
        }
    }

    /// Pass the frame to the next middleware, or execute it at the end of the chain.
    pub async fn run(self, frame: DispatchFrame<T>) -> DispatchOutcome<T> {
        match self.middlewares.split_first() {
            Some((middleware, rest)) => {
                middleware
                    .handle(frame, Next::new(rest, self.executor))
                    .await
            }
            None => self.executor.execute(frame).await,
        }
    }
}
