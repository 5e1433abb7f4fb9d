//! Result chaining between jobs of one dispatch.

use crate::DispatchTask;
use courier_core::{Job, JobResult};
use courier_error::{ChainingError, ChainingErrorKind, CourierResult};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Check that every consumed key is registered by an earlier job and that no
/// key is registered twice.
pub fn validate_chaining(tasks: &[DispatchTask]) -> CourierResult<()> {
    let mut registered = HashSet::new();
    for job in tasks.iter().flat_map(DispatchTask::jobs) {
        if let Some(consume) = &job.consume_result {
            if let Some(missing) = consume.keys.iter().find(|k| !registered.contains(k.as_str())) {
                let kind = ChainingErrorKind::UnregisteredKey(missing.clone());
                return Err(ChainingError::new(kind).into());
            }
        }
        if let Some(key) = &job.register_result {
            if !registered.insert(key.as_str()) {
                return Err(ChainingError::new(ChainingErrorKind::DuplicateKey(key.clone())).into());
            }
        }
    }
    Ok(())
}

/// Split a batch so that no job is sent together with a job whose result it
/// consumes.
pub fn split_waves(jobs: Vec<Job>) -> Vec<Vec<Job>> {
    let mut waves: Vec<Vec<Job>> = Vec::new();
    let mut current: Vec<Job> = Vec::new();
    let mut registered_in_wave: HashSet<String> = HashSet::new();

    for job in jobs {
        let depends_on_wave = job
            .consume_result
            .as_ref()
            .is_some_and(|c| c.keys.iter().any(|k| registered_in_wave.contains(k)));
        if depends_on_wave {
            waves.push(std::mem::take(&mut current));
            registered_in_wave.clear();
        }
        if let Some(key) = &job.register_result {
            registered_in_wave.insert(key.clone());
        }
        current.push(job);
    }
    if !current.is_empty() {
        waves.push(current);
    }
    waves
}

/// Results registered so far in one dispatch.
#[derive(Debug, Default)]
pub struct ResultRegistry {
    results: HashMap<String, JsonValue>,
}

impl ResultRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite a consuming job's request with the registered results.
    ///
    /// Jobs without `consume_result` are returned unchanged.
    pub fn accomplish(&self, mut job: Job) -> CourierResult<Job> {
        let Some(consume) = &job.consume_result else {
            return Ok(job);
        };
        if let Some(missing) = consume.keys.iter().find(|k| !self.results.contains_key(*k)) {
            let kind = ChainingErrorKind::UnregisteredKey(missing.clone());
            return Err(ChainingError::new(kind).into());
        }
        let request = (consume.accomplish)(&job.request, &consume.keys, &self.results).map_err(|e| {
            ChainingError::new(ChainingErrorKind::Accomplish(e.to_string()))
        })?;
        trace!(keys = ?consume.keys, url = %request.url, "Accomplished chained request");
        job.request = request;
        Ok(job)
    }

    /// Record the result of a registering job.
    pub fn register(&mut self, job: &Job, result: &JobResult) -> CourierResult<()> {
        let Some(key) = &job.register_result else {
            return Ok(());
        };
        if self.results.contains_key(key) {
            return Err(ChainingError::new(ChainingErrorKind::DuplicateKey(key.clone())).into());
        }
        self.results.insert(key.clone(), result.body.clone());
        Ok(())
    }

    /// Number of registered results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether nothing was registered yet.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{ConsumeResult, Request};
    use serde_json::json;

    fn producer(key: &str) -> Job {
        Job::new("c", Request::post("1/photos", json!({}))).with_register_result(key)
    }

    fn consumer(keys: &[&str]) -> Job {
        let keys = keys.iter().map(|k| k.to_string()).collect();
        Job::new("c", Request::post("1/feed", json!({}))).with_consume_result(ConsumeResult::new(
            keys,
            |request, keys, results| {
                let mut request = request.clone();
                let ids = keys
                    .iter()
                    .map(|k| results.lookup(k, "$.id"))
                    .collect::<CourierResult<Vec<_>>>()?;
                request.set_param("attached", JsonValue::Array(ids));
                Ok(request)
            },
        ))
    }

    #[test]
    fn test_split_waves_separates_consumer_from_producer() {
        let waves = split_waves(vec![producer("a"), producer("b"), consumer(&["a", "b"])]);
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0].len(), 2);
        assert_eq!(waves[1].len(), 1);
    }

    #[test]
    fn test_split_waves_keeps_independent_jobs_together() {
        let plain = Job::new("c", Request::post("me/messages", json!({})));
        let waves = split_waves(vec![plain.clone(), producer("a"), plain]);
        assert_eq!(waves.len(), 1);
    }

    #[test]
    fn test_validate_rejects_forward_reference() {
        let tasks = vec![DispatchTask::Dispatch(vec![consumer(&["a"]), producer("a")])];
        assert!(validate_chaining(&tasks).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_registration() {
        let tasks = vec![
            DispatchTask::Dispatch(vec![producer("a")]),
            DispatchTask::Dispatch(vec![producer("a")]),
        ];
        assert!(validate_chaining(&tasks).is_err());
    }

    #[test]
    fn test_accomplish_reads_registered_results() {
        let mut registry = ResultRegistry::new();
        registry
            .register(&producer("a"), &JobResult::ok(json!({ "id": "X" })))
            .unwrap();

        let job = registry.accomplish(consumer(&["a"])).unwrap();
        assert_eq!(job.request.params, json!({ "attached": ["X"] }));
    }

    #[test]
    fn test_accomplish_without_registration_fails() {
        let registry = ResultRegistry::new();
        assert!(registry.accomplish(consumer(&["a"])).is_err());
    }
}
