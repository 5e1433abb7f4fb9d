//! Keyed FIFO job queue.

use async_trait::async_trait;
use courier_core::Job;
use courier_interface::{ExecuteOutcome, Worker};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, trace};

/// Serializes batches that share an ordering key.
///
/// Batches touching the same key run one at a time, in the order they were
/// submitted; batches with disjoint keys run concurrently. Locks are taken in
/// sorted key order so batches spanning several keys cannot deadlock.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use courier_core::{Job, JobResult, Request};
/// use courier_dispatch::JobQueue;
/// use courier_interface::{ExecuteOutcome, Worker};
/// use serde_json::json;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Worker for Echo {
///     async fn execute_jobs(&self, jobs: &[Job]) -> ExecuteOutcome {
///         ExecuteOutcome::Success(jobs.iter().map(|j| JobResult::ok(j.request.params.clone())).collect())
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = JobQueue::new(Echo);
/// let job = Job::new("c", Request::post("me/messages", json!({ "n": 1 }))).with_key("chat:1");
/// assert!(queue.execute_jobs(&[job]).await.is_success());
/// assert_eq!(queue.pending_keys(), 0);
/// # }
/// ```
pub struct JobQueue {
    worker: Arc<dyn Worker>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl JobQueue {
    /// Queue in front of a worker.
    pub fn new(worker: impl Worker + 'static) -> Self {
        Self::from_arc(Arc::new(worker))
    }

    /// Queue in front of a shared worker.
    pub fn from_arc(worker: Arc<dyn Worker>) -> Self {
        Self {
            worker,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Number of keys with a batch running or waiting.
    pub fn pending_keys(&self) -> usize {
        self.locks.lock().len()
    }

    fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn release_idle(&self) {
        self.locks.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

#[async_trait]
impl Worker for JobQueue {
    #[instrument(skip(self, jobs), fields(jobs = jobs.len()))]
    async fn execute_jobs(&self, jobs: &[Job]) -> ExecuteOutcome {
        let mut keys: Vec<&str> = jobs.iter().filter_map(|j| j.key.as_deref()).collect();
        keys.sort_unstable();
        keys.dedup();

        let outcome = {
            let locks: Vec<_> = keys.iter().map(|k| self.lock_for(k)).collect();
            let mut guards = Vec::with_capacity(locks.len());
            for lock in locks {
                guards.push(lock.lock_owned().await);
            }
            trace!(keys = ?keys, "Acquired ordering keys");
            self.worker.execute_jobs(jobs).await
        };

        self.release_idle();
        outcome
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("pending_keys", &self.pending_keys())
            .finish_non_exhaustive()
    }
}
