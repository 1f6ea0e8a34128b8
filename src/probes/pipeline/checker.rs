use async_trait::async_trait;
use chrono::Utc;
use log::info;
use std::time::Duration;

use crate::checker::Checker;
use crate::config::Config;
use crate::error::Result;

use super::client::{PipelineApi, PipelineClient};
use super::logs::validate_task_log;
use super::poller::{poll_until_done, PollConfig};
use super::types::CreatePipelineRequest;

/// Minimal workflow the probe submits: a single echo task, enough to exercise
/// create, scheduling, execution and log collection end to end.
const TEST_PIPELINE_YML: &str = r#"version: "1.1"
stages:
- stage:
  - echo:
      alias: pipeline-test
      version: "1.0"
      timeout: 900
      params:
        what: "hello world, pipeline test!"
"#;

const PIPELINE_SOURCE: &str = "ops";

/// End-to-end health check of the pipeline subsystem.
///
/// One run submits the test workflow, polls it to completion and then verifies
/// that its first task shipped a non-empty log.
pub struct PipelineChecker<A> {
    name: String,
    api: A,
    cluster_name: String,
    poll: PollConfig,
    log_delay: Duration,
    check_timeout: Duration,
}

impl PipelineChecker<PipelineClient> {
    /// Build the production checker with an HTTP client derived from config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = PipelineClient::new(
            config.pipeline_url()?,
            config.dop_url()?,
            config.request_timeout,
        )?;
        Ok(Self::new(client, config))
    }
}

impl<A: PipelineApi> PipelineChecker<A> {
    pub fn new(api: A, config: &Config) -> Self {
        Self {
            name: "pipeline-check".to_owned(),
            api,
            cluster_name: config.cluster_name.clone(),
            poll: PollConfig {
                max_attempts: config.poll_max_attempts,
                interval: config.poll_interval,
            },
            log_delay: config.log_delay,
            check_timeout: config.check_timeout,
        }
    }

    fn create_request(&self) -> CreatePipelineRequest {
        CreatePipelineRequest {
            pipeline_yml: TEST_PIPELINE_YML.to_owned(),
            pipeline_yml_name: format!("pipeprobe-test-{}", Utc::now().timestamp()),
            cluster_name: self.cluster_name.clone(),
            pipeline_source: PIPELINE_SOURCE.to_owned(),
            auto_run_at_once: true,
        }
    }
}

#[async_trait]
impl<A: PipelineApi> Checker for PipelineChecker<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.check_timeout
    }

    async fn run(&self) -> Result<()> {
        let pipeline_id = self
            .api
            .create_pipeline(&self.create_request())
            .await
            .map_err(|e| e.in_step("create pipeline"))?;
        info!("created pipeline {pipeline_id}");

        poll_until_done(&self.api, pipeline_id, &self.poll)
            .await
            .map_err(|e| e.in_step("wait pipeline"))?;

        // give log shipping a chance to catch up before asserting on content
        tokio::time::sleep(self.log_delay).await;

        validate_task_log(&self.api, pipeline_id)
            .await
            .map_err(|e| e.in_step("check pipeline log"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::probes::pipeline::types::{
        LogLine, PipelineDetail, PipelineStage, PipelineTask,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn snapshot(statuses: &[&str]) -> PipelineDetail {
        PipelineDetail {
            id: 1,
            pipeline_stages: vec![PipelineStage {
                pipeline_tasks: statuses
                    .iter()
                    .enumerate()
                    .map(|(i, status)| PipelineTask {
                        id: 10 + i as u64,
                        name: format!("task-{i}"),
                        status: (*status).into(),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    /// Scripted remote service: fixed create id, queued snapshots, fixed log.
    struct ScriptedApi {
        created_id: u64,
        snapshots: Mutex<Vec<PipelineDetail>>,
        log_lines: Vec<LogLine>,
        creates: AtomicU32,
        fetches: AtomicU32,
        log_fetches: AtomicU32,
    }

    impl ScriptedApi {
        fn new(created_id: u64, snapshots: Vec<PipelineDetail>, log_lines: Vec<LogLine>) -> Self {
            Self {
                created_id,
                snapshots: Mutex::new(snapshots),
                log_lines,
                creates: AtomicU32::new(0),
                fetches: AtomicU32::new(0),
                log_fetches: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PipelineApi for ScriptedApi {
        async fn create_pipeline(&self, request: &CreatePipelineRequest) -> Result<u64> {
            assert!(request.auto_run_at_once);
            assert_eq!(request.pipeline_source, "ops");
            assert!(request.pipeline_yml_name.starts_with("pipeprobe-test-"));
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(self.created_id)
        }

        async fn fetch_pipeline(&self, pipeline_id: u64) -> Result<PipelineDetail> {
            assert_eq!(pipeline_id, self.created_id);
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut snapshots = self.snapshots.lock().unwrap();
            assert!(!snapshots.is_empty(), "checker fetched more than scripted");
            Ok(snapshots.remove(0))
        }

        async fn fetch_task_log(&self, pipeline_id: u64, _task_id: u64) -> Result<Vec<LogLine>> {
            assert_eq!(pipeline_id, self.created_id);
            self.log_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.log_lines.clone())
        }
    }

    fn test_config() -> Config {
        Config {
            login_user: "probe".into(),
            login_password: "secret".into(),
            service_namespace: "default".into(),
            cluster_name: "local-dev".into(),
            pipeline_url: None,
            dop_url: None,
            request_timeout: Duration::from_secs(2),
            check_timeout: Duration::from_secs(5),
            log_delay: Duration::ZERO,
            poll_max_attempts: 5,
            poll_interval: Duration::from_millis(1),
            debug: false,
        }
    }

    #[tokio::test]
    async fn check_passes_when_pipeline_finishes_and_logs_exist() {
        let api = ScriptedApi::new(
            42,
            vec![
                snapshot(&["Running"]),
                snapshot(&["Running"]),
                snapshot(&["Success"]),
                // one more fetch to locate the task for the log check
                snapshot(&["Success"]),
            ],
            vec![LogLine {
                content: "hello world, pipeline test!".into(),
            }],
        );

        let checker = PipelineChecker::new(api, &test_config());
        checker.run().await.unwrap();

        let api = &checker.api;
        assert_eq!(api.creates.load(Ordering::SeqCst), 1);
        assert_eq!(api.fetches.load(Ordering::SeqCst), 4);
        assert_eq!(api.log_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn check_fails_fast_on_stopped_pipeline() {
        let api = ScriptedApi::new(7, vec![snapshot(&["StopByUser"])], vec![]);

        let checker = PipelineChecker::new(api, &test_config());
        let err = checker.run().await.unwrap_err();

        assert!(err.to_string().contains("StopByUser"), "{err}");
        assert!(err.to_string().contains("wait pipeline"), "{err}");
        let api = &checker.api;
        assert_eq!(api.fetches.load(Ordering::SeqCst), 1, "no polling after failure");
        assert_eq!(api.log_fetches.load(Ordering::SeqCst), 0, "no log fetch after failure");
    }

    #[tokio::test]
    async fn check_reports_empty_log_as_failure() {
        let api = ScriptedApi::new(
            3,
            vec![snapshot(&["Success"]), snapshot(&["Success"])],
            vec![LogLine::default()],
        );

        let checker = PipelineChecker::new(api, &test_config());
        let err = checker.run().await.unwrap_err();

        match err {
            ProbeError::Check { step, source } => {
                assert_eq!(step, "check pipeline log");
                assert!(matches!(*source, ProbeError::LogEmpty));
            }
            other => panic!("expected wrapped log error, got {other}"),
        }
    }

    #[tokio::test]
    async fn create_failure_short_circuits() {
        struct FailingCreate;

        #[async_trait]
        impl PipelineApi for FailingCreate {
            async fn create_pipeline(&self, _request: &CreatePipelineRequest) -> Result<u64> {
                Err(ProbeError::Api {
                    status: 502,
                    message: "bad gateway".into(),
                })
            }

            async fn fetch_pipeline(&self, _pipeline_id: u64) -> Result<PipelineDetail> {
                panic!("must not poll after create fails")
            }

            async fn fetch_task_log(
                &self,
                _pipeline_id: u64,
                _task_id: u64,
            ) -> Result<Vec<LogLine>> {
                panic!("must not fetch logs after create fails")
            }
        }

        let checker = PipelineChecker::new(FailingCreate, &test_config());
        let err = checker.run().await.unwrap_err();
        assert!(err.to_string().contains("create pipeline"), "{err}");
    }
}
