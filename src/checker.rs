use anyhow::bail;
use async_trait::async_trait;
use log::{error, info};
use std::time::Duration;

use crate::error::Result;

/// One health check with a name and a deadline.
///
/// Checkers are independent; the runner drives them sequentially so a slow
/// check cannot starve another of the process deadline.
#[async_trait]
pub trait Checker: Send + Sync {
    fn name(&self) -> &str;

    /// Whole-check deadline enforced by the runner.
    fn timeout(&self) -> Duration;

    async fn run(&self) -> Result<()>;
}

/// Run every checker, each under its own deadline, and report the failures.
pub async fn run_checkers(checkers: &[Box<dyn Checker>]) -> anyhow::Result<()> {
    let mut failed = Vec::new();

    for checker in checkers {
        info!("running checker: {}", checker.name());
        match tokio::time::timeout(checker.timeout(), checker.run()).await {
            Ok(Ok(())) => info!("checker {} passed", checker.name()),
            Ok(Err(e)) => {
                error!("checker {} failed: {e}", checker.name());
                failed.push(checker.name().to_owned());
            }
            Err(_) => {
                error!(
                    "checker {} timed out after {:?}",
                    checker.name(),
                    checker.timeout()
                );
                failed.push(checker.name().to_owned());
            }
        }
    }

    if !failed.is_empty() {
        bail!("checkers failed: {}", failed.join(", "));
    }
    Ok(())
}
