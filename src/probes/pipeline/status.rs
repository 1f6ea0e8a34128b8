use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw pipeline/task status as reported by the pipeline service.
///
/// The remote vocabulary is open-ended: the platform is free to grow new states,
/// so this is a thin wrapper around the wire string rather than a closed enum.
/// Classification into buckets happens in [`PipelineStatus::bucket`]; anything
/// the probe does not recognize counts as still-running, never as success.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct PipelineStatus(pub String);

/// Verdict bucket for a single status value.
///
/// Every status maps to exactly one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBucket {
    /// Terminal, succeeded.
    Success,
    /// Terminal failure caused by the workload itself (user side).
    NormalFailure,
    /// Terminal failure caused by the platform (scheduler, DB, connectivity).
    AbnormalFailure,
    /// Anything not terminal yet, including states we do not recognize.
    Incomplete,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify this status into its verdict bucket.
    ///
    /// Pending states (`Born`, `Queue`, `Running`, approval states, ...) fall
    /// through to Incomplete together with anything unrecognized.
    pub fn bucket(&self) -> StatusBucket {
        match self.0.as_str() {
            "Success" => StatusBucket::Success,
            "AnalyzeFailed" | "Failed" | "Timeout" | "StopByUser" | "NoNeedBySystem" => {
                StatusBucket::NormalFailure
            }
            "CreateError" | "StartError" | "DBError" | "Error" | "Unknown" | "LostConn"
            | "CancelByRemote" => StatusBucket::AbnormalFailure,
            _ => StatusBucket::Incomplete,
        }
    }

    pub fn is_success(&self) -> bool {
        self.bucket() == StatusBucket::Success
    }

    /// True for both normal (user-side) and abnormal (platform-side) failures.
    pub fn is_failed(&self) -> bool {
        matches!(
            self.bucket(),
            StatusBucket::NormalFailure | StatusBucket::AbnormalFailure
        )
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PipelineStatus {
    fn from(status: &str) -> Self {
        Self(status.to_owned())
    }
}
