mod checker;
mod cli;
mod config;
mod error;
mod probes;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use checker::Checker;
use cli::Cli;
use probes::pipeline::PipelineChecker;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.debug);
    debug!("DEBUG MODE");

    let config = cli.into_config().context("parse config failed")?;

    let pipeline = PipelineChecker::from_config(&config)
        .context("construct pipeline checker failed")?;
    let checkers: Vec<Box<dyn Checker>> = vec![Box::new(pipeline)];

    checker::run_checkers(&checkers).await?;
    info!("all checkers passed");

    Ok(())
}

fn init_logger(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}
