use clap::Parser;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::error::{ProbeError, Result};

/// Command-line surface of the probe. Every argument can also be supplied
/// through the environment, which is how the in-cluster deployment feeds it.
#[derive(Parser, Debug)]
#[command(name = "pipeprobe")]
#[command(version, about = "Synthetic health-check probe for CI/CD pipeline platforms", long_about = None)]
pub struct Cli {
    /// Platform user the submission session belongs to.
    #[arg(long, env = "LOGIN_USER")]
    pub login_user: String,

    #[arg(long, env = "LOGIN_PASSWORD", hide_env_values = true)]
    pub login_password: String,

    /// Namespace used to derive in-cluster service hostnames.
    #[arg(long, env = "SERVICE_NAMESPACE", default_value = "default")]
    pub service_namespace: String,

    /// Cluster the test pipeline runs on.
    #[arg(long, env = "CLUSTER_NAME")]
    pub cluster_name: String,

    /// Pipeline-service base URL, overriding the in-cluster default.
    #[arg(long, env = "PIPELINE_URL")]
    pub pipeline_url: Option<String>,

    /// Log-gateway base URL, overriding the in-cluster default.
    #[arg(long, env = "DOP_URL")]
    pub dop_url: Option<String>,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Deadline for one whole check run, in seconds.
    #[arg(long, env = "CHECK_TIMEOUT_SECS", default_value_t = 900)]
    pub check_timeout_secs: u64,

    /// Sleep between pipeline completion and the log check, in seconds.
    #[arg(long, env = "LOG_DELAY_SECS", default_value_t = 60)]
    pub log_delay_secs: u64,

    /// Number of status polls before the check gives up.
    #[arg(long, env = "POLL_MAX_ATTEMPTS", default_value_t = 15)]
    pub poll_max_attempts: u32,

    /// Seconds between status polls.
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 60)]
    pub poll_interval_secs: u64,

    /// Enable debug logging.
    #[arg(long, env = "DEBUG", default_value_t = false)]
    pub debug: bool,
}

impl Cli {
    /// Resolve the parsed arguments into the runtime configuration.
    pub fn into_config(self) -> Result<Config> {
        Ok(Config {
            login_user: self.login_user,
            login_password: self.login_password,
            service_namespace: self.service_namespace,
            cluster_name: self.cluster_name,
            pipeline_url: parse_endpoint("pipeline-url", self.pipeline_url.as_deref())?,
            dop_url: parse_endpoint("dop-url", self.dop_url.as_deref())?,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            check_timeout: Duration::from_secs(self.check_timeout_secs),
            log_delay: Duration::from_secs(self.log_delay_secs),
            poll_max_attempts: self.poll_max_attempts,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            debug: self.debug,
        })
    }
}

fn parse_endpoint(name: &str, raw: Option<&str>) -> Result<Option<Url>> {
    raw.map(|raw| {
        Url::parse(raw).map_err(|e| ProbeError::Config(format!("invalid {name} '{raw}': {e}")))
    })
    .transpose()
}
