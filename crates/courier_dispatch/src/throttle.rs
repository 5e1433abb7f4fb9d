//! Rate-limited, retrying worker wrapper.

use async_trait::async_trait;
use courier_core::Job;
use courier_interface::{ExecuteOutcome, Worker};
use courier_rate_limit::{RateLimiter, RetryPolicy, RetryableError, TierConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// A batch the inner worker failed, carried through the retry loop.
struct FailedBatch(ExecuteOutcome);

impl RetryableError for FailedBatch {
    fn is_retryable(&self) -> bool {
        self.0.is_retryable()
    }

    fn retry_after(&self) -> Option<Duration> {
        self.0.retry_after()
    }
}

impl std::fmt::Display for FailedBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            ExecuteOutcome::Failure { errors, .. } => match errors.first() {
                Some(first) => write!(f, "{} failed jobs, first: {}", errors.len(), first),
                None => write!(f, "batch failed without errors"),
            },
            ExecuteOutcome::Success(_) => write!(f, "batch succeeded"),
        }
    }
}

/// Worker wrapper enforcing a tier's quotas and retrying transient failures.
///
/// Only batches in which nothing was delivered are retried, so a retry never
/// sends a message twice. Methods with their own quota in the tier
/// (`methods.<name>`) additionally pass through a per-method limiter; the
/// method is the last segment of the request URL.
pub struct ThrottledWorker<W> {
    inner: W,
    tier: TierConfig,
    limiter: RateLimiter<TierConfig>,
    method_limiters: Mutex<HashMap<String, Arc<RateLimiter<TierConfig>>>>,
    policy: RetryPolicy,
}

impl<W: Worker> ThrottledWorker<W> {
    /// Wrap a worker with the limits of `tier`.
    pub fn new(inner: W, tier: TierConfig, policy: RetryPolicy) -> Self {
        Self {
            inner,
            limiter: RateLimiter::new(tier.clone()),
            tier,
            method_limiters: Mutex::new(HashMap::new()),
            policy,
        }
    }

    /// The wrapped worker.
    pub fn inner(&self) -> &W {
        &self.inner
    }

    /// The tier being enforced.
    pub fn tier(&self) -> &TierConfig {
        &self.tier
    }

    fn method_limiter(&self, method: &str) -> Option<Arc<RateLimiter<TierConfig>>> {
        let has_override = self
            .tier
            .methods
            .keys()
            .any(|name| name.eq_ignore_ascii_case(method));
        if !has_override {
            return None;
        }
        let mut limiters = self.method_limiters.lock();
        let limiter = limiters
            .entry(method.to_ascii_lowercase())
            .or_insert_with(|| Arc::new(RateLimiter::new(self.tier.for_method(method))));
        Some(limiter.clone())
    }
}

fn method_name(job: &Job) -> &str {
    job.request
        .url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

#[async_trait]
impl<W: Worker> Worker for ThrottledWorker<W> {
    #[instrument(skip(self, jobs), fields(tier = %self.tier.name, jobs = jobs.len()))]
    async fn execute_jobs(&self, jobs: &[Job]) -> ExecuteOutcome {
        let mut methods: Vec<&str> = jobs.iter().map(method_name).collect();
        methods.sort_unstable();
        methods.dedup();
        let method_limiters: Vec<_> = methods
            .into_iter()
            .filter_map(|m| self.method_limiter(m))
            .collect();

        let result = self
            .limiter
            .execute(self.policy, || async {
                let mut _method_guards = Vec::with_capacity(method_limiters.len());
                for limiter in &method_limiters {
                    _method_guards.push(limiter.acquire().await);
                }
                match self.inner.execute_jobs(jobs).await {
                    ExecuteOutcome::Success(results) => Ok(results),
                    failure => Err(FailedBatch(failure)),
                }
            })
            .await;

        match result {
            Ok(results) => ExecuteOutcome::Success(results),
            Err(FailedBatch(outcome)) => {
                debug!(tier = %self.tier.name, "Batch failed after retries");
                outcome
            }
        }
    }
}
