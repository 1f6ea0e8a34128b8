use log::info;
use std::time::Duration;

use crate::error::{ProbeError, Result};

use super::client::PipelineApi;
use super::status::StatusBucket;
use super::types::PipelineDetail;

/// Bounds for the outer polling loop.
///
/// These compose with the client's per-call retry policy: worst-case wall
/// clock is `max_attempts * (interval + per-call retries)`.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

/// What one snapshot scan concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Every task in every stage finished successfully.
    Done,
    /// At least one task has not reached a terminal status yet.
    Incomplete,
}

/// Scan every task of every stage and fold the snapshot into a verdict.
///
/// A task with structured error messages, or with a status classifying as a
/// failure, fails the whole pipeline immediately. A non-success task marks the
/// snapshot incomplete but the scan keeps going, so a failure later in the
/// pipeline is still caught on the same snapshot.
pub fn evaluate_snapshot(detail: &PipelineDetail) -> Result<PollState> {
    let mut incomplete = false;

    for stage in &detail.pipeline_stages {
        for task in &stage.pipeline_tasks {
            let errors = task.error_summary();
            if !errors.is_empty() {
                return Err(ProbeError::PipelineFailure(format!(
                    "task {}: {errors}",
                    task.name
                )));
            }
            match task.status.bucket() {
                StatusBucket::NormalFailure | StatusBucket::AbnormalFailure => {
                    return Err(ProbeError::PipelineFailure(format!(
                        "task {} status: {}",
                        task.name, task.status
                    )));
                }
                StatusBucket::Incomplete => incomplete = true,
                StatusBucket::Success => {}
            }
        }
    }

    if incomplete {
        Ok(PollState::Incomplete)
    } else {
        Ok(PollState::Done)
    }
}

/// Poll a pipeline until every task succeeds, a task fails, or attempts run out.
///
/// Each attempt sleeps `interval` first, matching how long a freshly created
/// pipeline needs before it has anything to report. Fetch errors abort the
/// poll; running out of attempts is a [`ProbeError::PollTimeout`].
pub async fn poll_until_done<A: PipelineApi>(
    api: &A,
    pipeline_id: u64,
    config: &PollConfig,
) -> Result<()> {
    for attempt in 1..=config.max_attempts {
        tokio::time::sleep(config.interval).await;

        let detail = api.fetch_pipeline(pipeline_id).await?;
        match evaluate_snapshot(&detail)? {
            PollState::Done => {
                info!("pipeline {pipeline_id} finished after {attempt} poll attempt(s)");
                return Ok(());
            }
            PollState::Incomplete => {
                info!(
                    "pipeline {pipeline_id} still running (attempt {attempt}/{})",
                    config.max_attempts
                );
            }
        }
    }

    Err(ProbeError::PollTimeout {
        attempts: config.max_attempts,
    })
}
