use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("remote service rejected the request (code: {code}): {message}")]
    Application { code: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("pipeline failed: {0}")]
    PipelineFailure(String),

    #[error("pipeline task log is empty")]
    LogEmpty,

    #[error("pipeline did not finish within {attempts} poll attempts")]
    PollTimeout { attempts: u32 },

    #[error("{step} failed: {source}")]
    Check {
        step: &'static str,
        #[source]
        source: Box<ProbeError>,
    },
}

impl ProbeError {
    /// Attach the name of the check step an error surfaced from.
    pub fn in_step(self, step: &'static str) -> Self {
        ProbeError::Check {
            step,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
