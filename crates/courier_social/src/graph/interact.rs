//! Comments and threaded replies.

use super::GraphThread;
use super::post::photo_upload;
use crate::common::invalid_segment;
use courier_core::{ConsumeResult, DispatchResponse, Job, Request, Segment, SegmentValue, UnitValue};
use courier_error::{CompileError, CompileErrorKind, CourierResult};
use courier_interface::{DispatchTarget, JobCompiler};
use serde_json::{Value as JsonValue, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, instrument};

/// Compiles a comment on a thread.
///
/// The first text becomes the comment, with at most one photo attached to it.
/// Every later text is sent as a reply to that comment once its id is known.
#[derive(Debug, Default)]
pub struct GraphInteractCompiler {
    counter: AtomicUsize,
}

impl GraphInteractCompiler {
    /// A new compiler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobCompiler<GraphThread> for GraphInteractCompiler {
    #[instrument(skip_all, fields(target = %target.uid(), segments = segments.len()))]
    fn compile(&self, target: &GraphThread, segments: Vec<Segment>) -> CourierResult<Vec<Job>> {
        let mut texts = Vec::new();
        let mut photos: Vec<UnitValue> = Vec::new();

        for segment in &segments {
            match segment.value() {
                SegmentValue::Text(text) => texts.push(text.clone()),
                SegmentValue::Unit(unit) if unit.value_type() == Some("photo") => {
                    photos.push(unit.clone());
                }
                _ => {
                    return Err(invalid_segment(
                        segment,
                        target.uid(),
                        "only text and photo segments can be commented",
                    ));
                }
            }
        }

        if photos.len() > 1 {
            return Err(CompileError::new(CompileErrorKind::Arity {
                target: target.uid(),
                expected: "at most one photo segment".to_string(),
                found: photos.len(),
            })
            .into());
        }

        let page_id = target.page_id();
        let comments_url = format!("{}/comments", target.object_id());
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        let photo_key = format!("interact.{}.photo", id);
        let comment_key = format!("interact.{}.comment", id);

        let mut jobs = Vec::new();
        let photo = photos.pop();
        if let Some(photo) = &photo {
            let request =
                photo_upload(page_id, photo.payload().clone()).with_file(photo.file().clone());
            jobs.push(Job::new(page_id.clone(), request).with_register_result(photo_key.clone()));
        }

        let mut texts = texts.into_iter();
        let first = texts.next();
        if first.is_none() && photo.is_none() {
            return Ok(jobs);
        }

        let params = match &first {
            Some(text) => json!({ "message": text }),
            None => json!({}),
        };
        let mut comment = Job::new(page_id.clone(), Request::post(comments_url.clone(), params))
            .with_key(target.uid());
        if photo.is_some() {
            comment = comment.with_consume_result(ConsumeResult::new(
                vec![photo_key],
                |request, keys, lookup| {
                    let mut request = request.clone();
                    for key in keys {
                        request.set_param("attachment_id", lookup.lookup(key, "$.id")?);
                    }
                    Ok(request)
                },
            ));
        }

        let replies: Vec<String> = texts.collect();
        if !replies.is_empty() {
            comment = comment.with_register_result(comment_key.clone());
        }
        jobs.push(comment);

        for reply in replies {
            let request = Request::post(comments_url.clone(), json!({ "message": reply }));
            let consume = ConsumeResult::new(vec![comment_key.clone()], |request, keys, lookup| {
                let mut request = request.clone();
                for key in keys {
                    let comment_id = match lookup.lookup(key, "$.id")? {
                        JsonValue::String(id) => id,
                        other => other.to_string(),
                    };
                    request.url = format!("{}/comments", comment_id);
                }
                Ok(request)
            });
            jobs.push(
                Job::new(page_id.clone(), request)
                    .with_key(target.uid())
                    .with_consume_result(consume),
            );
        }

        debug!(jobs = jobs.len(), "Compiled interact jobs");
        Ok(jobs)
    }
}

/// Ids created by an interaction, sorted by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractResult {
    /// Created comment and reply ids, in order
    pub comments: Vec<String>,
    /// Uploaded photo ids, in order
    pub photos: Vec<String>,
}

impl InteractResult {
    /// Sort the results of an interaction dispatch by the endpoint each job hit.
    pub fn classify<T>(response: &DispatchResponse<T>) -> Self {
        let mut result = Self::default();
        for (job, job_result) in response.iter() {
            let Some(id) = job_result.body.get("id").and_then(JsonValue::as_str) else {
                continue;
            };
            if job.request.url.ends_with("/comments") {
                result.comments.push(id.to_string());
            } else if job.request.url.ends_with("/photos") {
                result.photos.push(id.to_string());
            }
        }
        result
    }
}
