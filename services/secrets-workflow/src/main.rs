//! Secrets workflow binary: runs the Conjur demonstration once and exits
//! non-zero on the first failure.

use anyhow::Context;
use rust_common::{TracingConfig, init_tracing};
use secrets_workflow::{Workflow, WorkflowConfig};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => {
            println!("\nDone!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Workflow failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(&TracingConfig::from_env().with_service_name("secrets-workflow"));
    let config = WorkflowConfig::from_env().context("loading workflow configuration")?;

    info!(host = %config.conjur.host, "Starting secrets workflow");

    let workflow = Workflow::new(config)?;
    workflow.run().await?;
    Ok(())
}
