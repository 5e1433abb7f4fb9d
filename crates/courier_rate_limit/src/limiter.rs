//! Rate limiter implementation using governor and Tokio Semaphore.
//!
//! Request quotas (per second, minute and day) use governor's GCRA limiters;
//! concurrency uses a Tokio semaphore.

use crate::{DispatchConfig, Tier};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const SECONDS_PER_DAY: u64 = 86_400;

/// Errors that know whether retrying the operation may succeed.
pub trait RetryableError {
    /// Whether the same operation may succeed when retried.
    fn is_retryable(&self) -> bool;

    /// Minimum wait the remote side asked for before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl RetryableError for courier_error::ExecutionError {
    fn is_retryable(&self) -> bool {
        courier_error::ExecutionError::is_retryable(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        courier_error::ExecutionError::retry_after(self)
    }
}

/// Exponential backoff settings for [`RateLimiter::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of retries after the first attempt
    pub retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound of any delay
    pub max_delay: Duration,
}

impl From<&DispatchConfig> for RetryPolicy {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            retries: config.retry_attempts,
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

/// Rate limiter that enforces the quotas of a tier.
///
/// # Example
///
/// ```
/// use courier_rate_limit::{RateLimiter, TierConfig};
/// use std::collections::HashMap;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let tier = TierConfig {
///     name: "Test".to_string(),
///     rps: None,
///     rpm: Some(60),
///     rpd: None,
///     max_concurrent: Some(1),
///     methods: HashMap::new(),
/// };
/// let limiter = RateLimiter::new(tier);
///
/// let guard = limiter.acquire().await;
/// assert!(limiter.try_acquire().is_none());
/// drop(guard);
/// # }
/// ```
#[derive(Clone)]
pub struct RateLimiter<T: Tier> {
    inner: T,
    rps_limiter: Option<Arc<DirectRateLimiter>>,
    rpm_limiter: Option<Arc<DirectRateLimiter>>,
    rpd_limiter: Option<Arc<DirectRateLimiter>>,
    concurrent_semaphore: Arc<Semaphore>,
}

impl<T: Tier> RateLimiter<T> {
    /// Create a new rate limiter enforcing every non-`None` limit of the tier.
    pub fn new(tier: T) -> Self {
        let rps_limiter = tier
            .rps()
            .and_then(NonZeroU32::new)
            .map(|n| Arc::new(GovernorRateLimiter::direct(Quota::per_second(n))));

        let rpm_limiter = tier
            .rpm()
            .and_then(NonZeroU32::new)
            .map(|n| Arc::new(GovernorRateLimiter::direct(Quota::per_minute(n))));

        // Daily quota replenishes one request every day/rpd, with the full day available as burst
        let rpd_limiter = tier.rpd().and_then(NonZeroU32::new).and_then(|n| {
            let period = Duration::from_secs(SECONDS_PER_DAY) / n.get();
            Quota::with_period(period)
                .map(|quota| Arc::new(GovernorRateLimiter::direct(quota.allow_burst(n))))
        });

        let max_concurrent = tier
            .max_concurrent()
            .map(|n| n as usize)
            .unwrap_or(Semaphore::MAX_PERMITS);
        let concurrent_semaphore = Arc::new(Semaphore::new(max_concurrent));

        debug!(
            tier = tier.name(),
            rps = ?tier.rps(),
            rpm = ?tier.rpm(),
            rpd = ?tier.rpd(),
            max_concurrent,
            "Created rate limiter"
        );

        Self {
            inner: tier,
            rps_limiter,
            rpm_limiter,
            rpd_limiter,
            concurrent_semaphore,
        }
    }

    /// Get a reference to the inner tier value.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Wait until every quota allows one more request.
    ///
    /// Returns a guard that releases the concurrent slot when dropped.
    pub async fn acquire(&self) -> RateLimiterGuard {
        if let Some(limiter) = &self.rps_limiter {
            limiter.until_ready().await;
        }

        if let Some(limiter) = &self.rpm_limiter {
            limiter.until_ready().await;
        }

        if let Some(limiter) = &self.rpd_limiter {
            limiter.until_ready().await;
        }

        // Concurrent slot last to avoid holding it while waiting on quotas
        let permit = match self.concurrent_semaphore.clone().acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(e) => {
                warn!(error = %e, "Concurrency semaphore closed, continuing without slot");
                None
            }
        };

        RateLimiterGuard { _permit: permit }
    }

    /// Try to acquire without waiting.
    ///
    /// Returns `None` if any limit would block.
    pub fn try_acquire(&self) -> Option<RateLimiterGuard> {
        if let Some(limiter) = &self.rps_limiter {
            limiter.check().ok()?;
        }

        if let Some(limiter) = &self.rpm_limiter {
            limiter.check().ok()?;
        }

        if let Some(limiter) = &self.rpd_limiter {
            limiter.check().ok()?;
        }

        let permit = self.concurrent_semaphore.clone().try_acquire_owned().ok()?;

        Some(RateLimiterGuard {
            _permit: Some(permit),
        })
    }

    /// Execute an operation with rate limiting and exponential backoff retry.
    ///
    /// Each attempt first acquires rate limit permission. Errors reporting
    /// themselves as retryable are retried with jittered backoff according to
    /// `policy`; other errors are returned immediately. When an error carries a
    /// [`RetryableError::retry_after`] hint, the next attempt waits at least
    /// that long on top of the backoff delay.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let result = limiter.execute(RetryPolicy::default(), || async {
    ///     worker.send(&request).await
    /// }).await?;
    /// ```
    pub async fn execute<F, Fut, R, E>(&self, policy: RetryPolicy, operation: F) -> Result<R, E>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<R, E>>,
        E: RetryableError + std::fmt::Display,
    {
        use tokio_retry2::{Retry, RetryError, strategy::ExponentialBackoff, strategy::jitter};

        // Base 2 scaled by half the initial delay: initial, 2x initial, 4x initial, ...
        let factor = (policy.initial_delay.as_millis() as u64 / 2).max(1);
        let retry_strategy = ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(policy.max_delay)
            .map(jitter)
            .take(policy.retries);

        let attempts = AtomicUsize::new(0);

        Retry::spawn(retry_strategy, || async {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            let outcome = {
                let _guard = self.acquire().await;
                operation().await
            };

            match outcome {
                Ok(value) => Ok(value),
                Err(e) if !e.is_retryable() => {
                    warn!("Permanent error, failing immediately: {}", e);
                    Err(RetryError::Permanent(e))
                }
                Err(e) => {
                    let retry_after = e.retry_after();
                    warn!(attempt, ?retry_after, "Transient error, will retry: {}", e);
                    // Retry sleeps only the strategy delay
                    if let Some(wait) = retry_after.filter(|_| attempt < policy.retries) {
                        tokio::time::sleep(wait).await;
                    }
                    Err(RetryError::Transient { err: e, retry_after })
                }
            }
        })
        .await
    }
}

/// RAII guard for rate limiter.
///
/// Releases the concurrent request slot when dropped.
pub struct RateLimiterGuard {
    _permit: Option<tokio::sync::OwnedSemaphorePermit>,
}
