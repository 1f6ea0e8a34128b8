use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::error::{ProbeError, Result};

use super::types::{
    ApiResponse, CreatePipelineRequest, CreatedPipeline, LogLine, PipelineDetail, TaskLog,
};

/// Header the pipeline service uses to recognize internal platform clients.
const INTERNAL_CLIENT_HEADER: &str = "Internal-Client";
const INTERNAL_CLIENT_VALUE: &str = "bundle";

const CREATE_PATH: &str = "/api/v2/pipelines";
const QUERY_PATH: &str = "/api/pipelines";

/// Bounded retry with capped exponential backoff, applied to a single call.
///
/// Only transport-level failures and retryable HTTP statuses (429, 5xx) are
/// retried; business-level rejections surface immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub wait: Duration,
    pub max_wait: Duration,
}

impl RetryPolicy {
    /// Default policy for pipeline create/query calls.
    pub fn query() -> Self {
        Self {
            max_retries: 3,
            wait: Duration::from_secs(3),
            max_wait: Duration::from_secs(20),
        }
    }

    /// Policy for log queries. Log indexing lags the pipeline itself, so the
    /// backoff window is wider.
    pub fn logs() -> Self {
        Self {
            max_retries: 3,
            wait: Duration::from_secs(10),
            max_wait: Duration::from_secs(60),
        }
    }

    /// Delay before retry number `attempt` (0-based), doubling up to the cap.
    fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.wait.saturating_mul(factor).min(self.max_wait)
    }
}

/// Remote pipeline-service operations the probe depends on.
///
/// The HTTP client below is the production implementation; tests drive the
/// poller and checker through scripted fakes.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Submit a pipeline and return its id.
    async fn create_pipeline(&self, request: &CreatePipelineRequest) -> Result<u64>;

    /// Fetch the current snapshot of a pipeline, validated structurally.
    async fn fetch_pipeline(&self, pipeline_id: u64) -> Result<PipelineDetail>;

    /// Fetch the job log lines of one task.
    async fn fetch_task_log(&self, pipeline_id: u64, task_id: u64) -> Result<Vec<LogLine>>;
}

/// HTTP client for the pipeline service and the log-query gateway.
pub struct PipelineClient {
    client: reqwest::Client,
    pipeline_url: Url,
    dop_url: Url,
    query_retry: RetryPolicy,
    log_retry: RetryPolicy,
}

impl PipelineClient {
    pub fn new(pipeline_url: Url, dop_url: Url, request_timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("pipeprobe/0.3"));
        headers.insert(
            INTERNAL_CLIENT_HEADER,
            HeaderValue::from_static(INTERNAL_CLIENT_VALUE),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProbeError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            pipeline_url,
            dop_url,
            query_retry: RetryPolicy::query(),
            log_retry: RetryPolicy::logs(),
        })
    }

    fn endpoint(base: &Url, path: &str) -> Result<Url> {
        base.join(path)
            .map_err(|e| ProbeError::Config(format!("invalid endpoint {path}: {e}")))
    }

    /// Send a request, retrying transient failures, and unwrap the envelope.
    ///
    /// `build` is invoked once per attempt since a `RequestBuilder` is consumed
    /// by `send`.
    async fn execute<T, F>(&self, policy: &RetryPolicy, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut retry_count = 0;
        loop {
            let response = match build().send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                    if retry_count >= policy.max_retries {
                        return Err(e.into());
                    }
                    let delay = policy.delay(retry_count);
                    warn!(
                        "network error ({}), retrying in {:?} ({}/{})...",
                        e,
                        delay,
                        retry_count + 1,
                        policy.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status == 429 || status.is_server_error() {
                if retry_count >= policy.max_retries {
                    return Err(ProbeError::Api {
                        status: status.as_u16(),
                        message: format!("still failing after {} retries", policy.max_retries),
                    });
                }
                let delay = policy.delay(retry_count);
                warn!(
                    "pipeline service error (status {status}), retrying in {:?} ({}/{})...",
                    delay,
                    retry_count + 1,
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unable to read error response".to_string());
                return Err(ProbeError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            let envelope: ApiResponse<T> = serde_json::from_str(&body)?;

            if !envelope.success || !envelope.err.msg.is_empty() {
                return Err(ProbeError::Application {
                    code: envelope.err.code,
                    message: envelope.err.msg,
                });
            }

            return envelope.data.ok_or_else(|| {
                ProbeError::MalformedResponse("response envelope carries no data".into())
            });
        }
    }
}

#[async_trait]
impl PipelineApi for PipelineClient {
    async fn create_pipeline(&self, request: &CreatePipelineRequest) -> Result<u64> {
        let url = Self::endpoint(&self.pipeline_url, CREATE_PATH)?;

        let created: CreatedPipeline = self
            .execute(&self.query_retry, || {
                self.client.post(url.clone()).json(request)
            })
            .await?;

        if created.id <= 0 {
            return Err(ProbeError::MalformedResponse(format!(
                "create pipeline returned invalid id: {}",
                created.id
            )));
        }
        debug!("created pipeline {}", created.id);

        Ok(created.id as u64)
    }

    async fn fetch_pipeline(&self, pipeline_id: u64) -> Result<PipelineDetail> {
        let url = Self::endpoint(&self.pipeline_url, &format!("{QUERY_PATH}/{pipeline_id}"))?;

        let detail: PipelineDetail = self
            .execute(&self.query_retry, || self.client.get(url.clone()))
            .await?;

        if detail.pipeline_stages.is_empty() {
            return Err(ProbeError::MalformedResponse(format!(
                "pipeline {pipeline_id}: snapshot has no stages"
            )));
        }
        if detail.pipeline_stages[0].pipeline_tasks.is_empty() {
            return Err(ProbeError::MalformedResponse(format!(
                "pipeline {pipeline_id}: first stage has no tasks"
            )));
        }

        Ok(detail)
    }

    async fn fetch_task_log(&self, pipeline_id: u64, task_id: u64) -> Result<Vec<LogLine>> {
        let path = format!("/api/cicd/{pipeline_id}/tasks/{task_id}/logs");
        let url = Self::endpoint(&self.dop_url, &path)?;

        let log: TaskLog = self
            .execute(&self.log_retry, || {
                self.client
                    .get(url.clone())
                    .query(&[("source", "job"), ("start", "0"), ("count", "-2")])
            })
            .await?;

        Ok(log.lines)
    }
}
