//! Page feed posts with attached photos.

use super::GraphPage;
use crate::common::invalid_segment;
use courier_core::{ConsumeResult, Job, Request, Segment, SegmentValue};
use courier_error::{CompileError, CompileErrorKind, CourierResult};
use courier_interface::{DispatchTarget, JobCompiler};
use serde_json::{Value as JsonValue, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, instrument};

/// Unpublished photo upload to the page.
pub(crate) fn photo_upload(page_id: &str, mut payload: JsonValue) -> Request {
    if let Some(map) = payload.as_object_mut() {
        map.remove("type");
        map.insert("published".to_string(), JsonValue::Bool(false));
    }
    Request::post(format!("{}/photos", page_id), payload)
}

/// Compiles a feed post.
///
/// Accepts at most one text or `post` segment plus any number of `photo`
/// units. Photos are uploaded unpublished first, then the post is created
/// with the uploaded ids as `attached_media`.
#[derive(Debug, Default)]
pub struct GraphPostCompiler {
    counter: AtomicUsize,
}

impl GraphPostCompiler {
    /// A new compiler.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_key(&self) -> String {
        format!("post.photo.{}", self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

impl JobCompiler<GraphPage> for GraphPostCompiler {
    #[instrument(skip_all, fields(target = %target.uid(), segments = segments.len()))]
    fn compile(&self, target: &GraphPage, segments: Vec<Segment>) -> CourierResult<Vec<Job>> {
        let mut post: Option<JsonValue> = None;
        let mut posts_found = 0;
        let mut photos = Vec::new();

        for segment in &segments {
            match segment.value() {
                SegmentValue::Text(text) => {
                    posts_found += 1;
                    post = Some(json!({ "message": text }));
                }
                SegmentValue::Unit(unit) if unit.value_type() == Some("post") => {
                    posts_found += 1;
                    let mut params = unit.payload().clone();
                    if let Some(map) = params.as_object_mut() {
                        map.remove("type");
                    }
                    post = Some(params);
                }
                SegmentValue::Unit(unit) if unit.value_type() == Some("photo") => {
                    photos.push(unit.clone());
                }
                _ => {
                    return Err(invalid_segment(
                        segment,
                        target.uid(),
                        "only text, post and photo segments can be posted",
                    ));
                }
            }
        }

        if posts_found > 1 {
            return Err(CompileError::new(CompileErrorKind::Arity {
                target: target.uid(),
                expected: "at most one text or post segment".to_string(),
                found: posts_found,
            })
            .into());
        }

        let page_id = target.page_id();
        let mut jobs = Vec::with_capacity(photos.len() + 1);
        let mut keys = Vec::with_capacity(photos.len());
        for photo in photos {
            let key = self.next_key();
            let request = photo_upload(page_id, photo.payload().clone())
                .with_file(photo.file().clone());
            jobs.push(Job::new(page_id.clone(), request).with_register_result(key.clone()));
            keys.push(key);
        }

        let feed = Request::post(format!("{}/feed", page_id), post.unwrap_or_else(|| json!({})));
        let mut post_job = Job::new(page_id.clone(), feed);
        if !keys.is_empty() {
            post_job = post_job.with_consume_result(ConsumeResult::new(
                keys,
                |request, keys, lookup| {
                    let mut media = Vec::with_capacity(keys.len());
                    for key in keys {
                        media.push(json!({ "media_fbid": lookup.lookup(key, "$.id")? }));
                    }
                    let mut request = request.clone();
                    request.set_param("attached_media", JsonValue::Array(media));
                    Ok(request)
                },
            ));
        }
        jobs.push(post_job);

        debug!(jobs = jobs.len(), "Compiled post jobs");
        Ok(jobs)
    }
}
