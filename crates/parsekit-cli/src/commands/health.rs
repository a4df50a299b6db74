//! Health command implementation.

use anyhow::{Context, Result};
use clap::Args;
use parsekit::ParseApi;

use crate::cli::ConnectionArgs;
use crate::connection;
use crate::output;

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Print the raw response as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: HealthArgs, connection: ConnectionArgs) -> Result<()> {
    let api = connection::connect(&connection)?;
    let report = api.health().await.context("Health check failed")?;

    if args.json {
        return output::json(&report);
    }

    let status = report
        .get("status")
        .and_then(|s| s.as_str())
        .unwrap_or("unknown");
    output::success(&format!("{} is {}", api.client().server(), status));
    Ok(())
}
