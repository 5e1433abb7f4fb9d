//! Reusable attachment uploads.

use super::GraphPage;
use crate::common::invalid_segment;
use courier_core::{Job, Request, Segment, SegmentValue};
use courier_error::{CompileError, CompileErrorKind, CourierResult};
use courier_interface::{DispatchTarget, JobCompiler};
use serde_json::{Value as JsonValue, json};
use tracing::instrument;

const ATTACHMENTS_URL: &str = "me/message_attachments";

/// Uploads one Messenger attachment so it can be sent again by id.
///
/// Accepts exactly one unit segment with a `message.attachment` value, such as
/// an `image` element. The `attachment_id` of the upload is in the job result.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphAttachmentCompiler;

impl JobCompiler<GraphPage> for GraphAttachmentCompiler {
    #[instrument(skip_all, fields(target = %target.uid(), segments = segments.len()))]
    fn compile(&self, target: &GraphPage, segments: Vec<Segment>) -> CourierResult<Vec<Job>> {
        let [segment] = <[Segment; 1]>::try_from(segments).map_err(|segments| {
            CompileError::new(CompileErrorKind::Arity {
                target: target.uid(),
                expected: "exactly one attachment segment".to_string(),
                found: segments.len(),
            })
        })?;

        let SegmentValue::Unit(unit) = segment.value() else {
            return Err(invalid_segment(&segment, target.uid(), "only units can be uploaded"));
        };
        let Some(attachment) = unit.payload().pointer("/message/attachment") else {
            return Err(invalid_segment(&segment, target.uid(), "unit has no attachment"));
        };

        let mut attachment = attachment.clone();
        if let Some(payload) = attachment.get_mut("payload").and_then(JsonValue::as_object_mut) {
            payload.insert("is_reusable".to_string(), JsonValue::Bool(true));
        }

        let params = json!({ "message": { "attachment": attachment } });
        let request = Request::post(ATTACHMENTS_URL, params).with_file(unit.file().clone());
        Ok(vec![Job::new(target.page_id().clone(), request)])
    }
}
