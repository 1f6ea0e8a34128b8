use log::info;

use crate::error::{ProbeError, Result};

use super::client::PipelineApi;
use super::types::LogLine;

/// Check that the first task of the pipeline produced at least one non-empty
/// log line.
///
/// The snapshot is re-fetched to resolve the task id; the fetcher has already
/// validated that the first stage and task exist.
pub async fn validate_task_log<A: PipelineApi>(api: &A, pipeline_id: u64) -> Result<()> {
    let detail = api.fetch_pipeline(pipeline_id).await?;

    let task_id = detail
        .first_task()
        .map(|task| task.id)
        .ok_or_else(|| {
            ProbeError::MalformedResponse(format!("pipeline {pipeline_id}: snapshot has no tasks"))
        })?;

    let lines = api.fetch_task_log(pipeline_id, task_id).await?;

    match last_non_empty(&lines) {
        Some(content) => {
            info!("pipeline {pipeline_id} task {task_id} log sample: {content}");
            Ok(())
        }
        None => Err(ProbeError::LogEmpty),
    }
}

/// Last line with non-empty content, the representative sample of the log.
fn last_non_empty(lines: &[LogLine]) -> Option<&str> {
    lines
        .iter()
        .rev()
        .map(|line| line.content.as_str())
        .find(|content| !content.is_empty())
}
