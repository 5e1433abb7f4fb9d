//! Pause and thunk markers placed between sends.

use courier_error::CourierResult;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

/// Async callback awaited by a pause before the next batch is sent.
pub type PauseAfter = Arc<dyn Fn() -> BoxFuture<'static, CourierResult<()>> + Send + Sync>;

/// Async side effect executed in sequence with the surrounding sends.
pub type ThunkEffect = Arc<dyn Fn() -> BoxFuture<'static, CourierResult<()>> + Send + Sync>;

/// A pause between two batches of jobs.
///
/// The delay is awaited first, then the `after` callback.
///
/// # Examples
///
/// ```
/// use courier_core::Pause;
/// use std::time::Duration;
///
/// let pause = Pause::new().with_delay(Duration::from_millis(500));
/// assert_eq!(pause.delay(), Some(Duration::from_millis(500)));
/// ```
#[derive(Clone, Default)]
pub struct Pause {
    delay: Option<Duration>,
    after: Option<PauseAfter>,
}

impl Pause {
    /// A pause without delay or callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for a fixed duration.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Await an async callback.
    pub fn with_after<F, Fut>(mut self, after: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = CourierResult<()>> + Send + 'static,
    {
        self.after = Some(Arc::new(move || Box::pin(after())));
        self
    }

    /// Configured delay, if any.
    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    /// Whether an `after` callback is set.
    pub fn has_after(&self) -> bool {
        self.after.is_some()
    }

    /// Await the delay and then the callback.
    pub async fn wait(&self) -> CourierResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(after) = &self.after {
            after().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Pause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pause")
            .field("delay", &self.delay)
            .field("after", &self.after.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// A side effect run at its position in the send sequence.
#[derive(Clone)]
pub struct Thunk {
    effect: ThunkEffect,
}

impl Thunk {
    /// Wrap an async effect.
    pub fn new<F, Fut>(effect: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = CourierResult<()>> + Send + 'static,
    {
        Self {
            effect: Arc::new(move || Box::pin(effect())),
        }
    }

    /// Run the effect.
    pub async fn run(&self) -> CourierResult<()> {
        (self.effect)().await
    }
}

impl std::fmt::Debug for Thunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Thunk(<fn>)")
    }
}
