use std::time::Duration;
use url::Url;

use crate::error::{ProbeError, Result};

/// Runtime configuration for a probe process.
///
/// Built once from the CLI/environment in `main` and handed to each component;
/// nothing reads the environment after startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Platform account the submission session runs under.
    pub login_user: String,
    pub login_password: String,

    /// Namespace the platform services live in; used to derive in-cluster
    /// hostnames when no explicit endpoint override is given.
    pub service_namespace: String,

    /// Cluster the test pipeline is scheduled on.
    pub cluster_name: String,

    /// Explicit pipeline-service endpoint, overriding the in-cluster default.
    pub pipeline_url: Option<Url>,
    /// Explicit log-gateway endpoint, overriding the in-cluster default.
    pub dop_url: Option<Url>,

    /// Timeout applied to each HTTP call.
    pub request_timeout: Duration,
    /// Deadline for one whole check run.
    pub check_timeout: Duration,
    /// Sleep between pipeline completion and the log check.
    pub log_delay: Duration,

    pub poll_max_attempts: u32,
    pub poll_interval: Duration,

    pub debug: bool,
}

impl Config {
    /// Pipeline-service base URL: the override, or the in-cluster service host.
    pub fn pipeline_url(&self) -> Result<Url> {
        match &self.pipeline_url {
            Some(url) => Ok(url.clone()),
            None => in_cluster_url("pipeline", &self.service_namespace, 3081),
        }
    }

    /// Log-gateway base URL: the override, or the in-cluster service host.
    pub fn dop_url(&self) -> Result<Url> {
        match &self.dop_url {
            Some(url) => Ok(url.clone()),
            None => in_cluster_url("dop", &self.service_namespace, 9527),
        }
    }
}

fn in_cluster_url(service: &str, namespace: &str, port: u16) -> Result<Url> {
    let raw = format!("http://{service}.{namespace}.svc.cluster.local:{port}");
    Url::parse(&raw).map_err(|e| ProbeError::Config(format!("invalid service URL {raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            login_user: "probe".into(),
            login_password: "secret".into(),
            service_namespace: "erda-system".into(),
            cluster_name: "local-dev".into(),
            pipeline_url: None,
            dop_url: None,
            request_timeout: Duration::from_secs(10),
            check_timeout: Duration::from_secs(900),
            log_delay: Duration::from_secs(60),
            poll_max_attempts: 15,
            poll_interval: Duration::from_secs(60),
            debug: false,
        }
    }

    #[test]
    fn in_cluster_hosts_derive_from_namespace() {
        let config = config();
        assert_eq!(
            config.pipeline_url().unwrap().as_str(),
            "http://pipeline.erda-system.svc.cluster.local:3081/"
        );
        assert_eq!(
            config.dop_url().unwrap().as_str(),
            "http://dop.erda-system.svc.cluster.local:9527/"
        );
    }

    #[test]
    fn explicit_endpoints_win_over_derivation() {
        let mut config = config();
        config.pipeline_url = Some(Url::parse("http://localhost:3081").unwrap());
        config.dop_url = Some(Url::parse("http://localhost:9527").unwrap());
        assert_eq!(config.pipeline_url().unwrap().as_str(), "http://localhost:3081/");
        assert_eq!(config.dop_url().unwrap().as_str(), "http://localhost:9527/");
    }
}
