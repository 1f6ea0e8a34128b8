use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::status::PipelineStatus;

/// Response envelope shared by every pipeline-service endpoint.
///
/// HTTP 200 alone does not mean the call worked: the service signals
/// business-level failure through `success`/`err` while `data` may be absent.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub err: ApiErr,
    pub data: Option<T>,
}

/// Business-level error carried in the response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErr {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub msg: String,
}

/// Body of `POST /api/v2/pipelines`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePipelineRequest {
    /// Workflow definition, verbatim YAML.
    pub pipeline_yml: String,
    /// Unique name for this submission.
    pub pipeline_yml_name: String,
    /// Cluster the pipeline should run on.
    pub cluster_name: String,
    /// Submission source tag.
    pub pipeline_source: String,
    /// Start executing immediately instead of waiting for a manual run.
    pub auto_run_at_once: bool,
}

/// `data` payload of a successful create call.
#[derive(Debug, Deserialize)]
pub struct CreatedPipeline {
    #[serde(default)]
    pub id: i64,
}

/// Point-in-time read of a pipeline: metadata plus ordered stages and tasks.
///
/// Fetched fresh on every poll and discarded after evaluation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDetail {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub status: PipelineStatus,
    /// Total cost in seconds, -1 when not yet known.
    #[serde(default)]
    pub cost_time_sec: Option<i64>,
    #[serde(default)]
    pub time_begin: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pipeline_stages: Vec<PipelineStage>,
}

/// One stage of a pipeline, holding its ordered tasks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStage {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: PipelineStatus,
    #[serde(default)]
    pub pipeline_tasks: Vec<PipelineTask>,
}

/// One task within a stage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTask {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: PipelineStatus,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub result: TaskResult,
    #[serde(default)]
    pub cost_time_sec: Option<i64>,
    #[serde(default)]
    pub time_begin: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_end: Option<DateTime<Utc>>,
}

/// Execution result attached to a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub errors: Vec<TaskError>,
}

/// Structured error reported by a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub msg: String,
}

/// `data` payload of the task-log endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskLog {
    #[serde(default)]
    pub lines: Vec<LogLine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogLine {
    #[serde(default)]
    pub content: String,
}

impl PipelineDetail {
    /// First task of the first stage, if the snapshot has one.
    pub fn first_task(&self) -> Option<&PipelineTask> {
        self.pipeline_stages
            .first()
            .and_then(|stage| stage.pipeline_tasks.first())
    }
}

impl PipelineTask {
    /// Non-empty structured error messages for this task, joined with `"; "`.
    ///
    /// Empty when the task reported no errors (or only blank messages).
    pub fn error_summary(&self) -> String {
        self.result
            .errors
            .iter()
            .filter(|e| !e.msg.is_empty())
            .map(|e| e.msg.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
