//! Splitting rendered segments into sequential dispatch tasks.

use courier_core::{Job, Pause, Segment, SegmentValue, TaskSummary, Thunk};
use courier_error::{CompileError, CompileErrorKind, CourierResult};
use courier_interface::{DispatchTarget, JobCompiler};
use tracing::debug;

/// One step of a dispatch, executed strictly after the previous one.
#[derive(Debug, Clone)]
pub enum DispatchTask {
    /// Jobs compiled from one batch of segments
    Dispatch(Vec<Job>),
    /// Wait between batches
    Pause(Pause),
    /// Side effect run in sequence with the batches
    Thunk(Thunk),
}

impl DispatchTask {
    /// Summary reported in the dispatch response.
    pub fn summary(&self) -> TaskSummary {
        match self {
            Self::Dispatch(jobs) => TaskSummary::Dispatch(jobs.len()),
            Self::Pause(_) => TaskSummary::Pause,
            Self::Thunk(_) => TaskSummary::Thunk,
        }
    }

    /// Jobs of the task, empty for pauses and thunks.
    pub fn jobs(&self) -> &[Job] {
        match self {
            Self::Dispatch(jobs) => jobs,
            _ => &[],
        }
    }
}

/// Split segments at pauses and thunks and compile every batch in between.
///
/// Breaks are dropped; they never start a batch. Batches that compile to no
/// jobs produce no task.
///
/// # Errors
///
/// Fails before anything is sent when a pause is addressed to a target that
/// does not accept pauses, or when the compiler rejects a batch.
pub fn build_tasks<T, C>(
    target: &T,
    segments: Vec<Segment>,
    compiler: &C,
) -> CourierResult<Vec<DispatchTask>>
where
    T: DispatchTarget,
    C: JobCompiler<T> + ?Sized,
{
    let mut tasks = Vec::new();
    let mut batch = Vec::new();

    for segment in segments {
        match segment.value() {
            SegmentValue::Break => continue,
            SegmentValue::Pause(pause) => {
                if !target.allow_pause() {
                    return Err(CompileError::new(CompileErrorKind::InvalidSegment {
                        node: segment.node().clone(),
                        path: segment.path().clone(),
                        target: target.uid(),
                        reason: "pausing is not allowed for this target".to_string(),
                    })
                    .into());
                }
                let pause = pause.clone();
                flush(target, compiler, &mut batch, &mut tasks)?;
                tasks.push(DispatchTask::Pause(pause));
            }
            SegmentValue::Thunk(thunk) => {
                let thunk = thunk.clone();
                flush(target, compiler, &mut batch, &mut tasks)?;
                tasks.push(DispatchTask::Thunk(thunk));
            }
            _ => batch.push(segment),
        }
    }
    flush(target, compiler, &mut batch, &mut tasks)?;

    debug!(tasks = tasks.len(), target = %target.uid(), "Built dispatch tasks");
    Ok(tasks)
}

fn flush<T, C>(
    target: &T,
    compiler: &C,
    batch: &mut Vec<Segment>,
    tasks: &mut Vec<DispatchTask>,
) -> CourierResult<()>
where
    T: DispatchTarget,
    C: JobCompiler<T> + ?Sized,
{
    if batch.is_empty() {
        return Ok(());
    }
    let jobs = compiler.compile(target, std::mem::take(batch))?;
    if !jobs.is_empty() {
        tasks.push(DispatchTask::Dispatch(jobs));
    }
    Ok(())
}
