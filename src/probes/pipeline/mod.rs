mod checker;
mod client;
mod logs;
mod poller;
mod status;
mod types;

pub use checker::PipelineChecker;
pub use client::{PipelineApi, PipelineClient};
