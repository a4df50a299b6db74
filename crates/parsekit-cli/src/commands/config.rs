//! Config command implementation.

use anyhow::{Context, Result};
use clap::Args;
use parsekit::ParseApi;

use crate::cli::ConnectionArgs;
use crate::connection;
use crate::output;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print only this parameter
    pub name: Option<String>,
}

pub async fn run(args: ConfigArgs, connection: ConnectionArgs) -> Result<()> {
    let api = connection::connect(&connection)?;
    let params = api
        .server_config()
        .await
        .context("Failed to fetch config")?;

    match args.name {
        Some(name) => {
            let value = params
                .get(&name)
                .with_context(|| format!("No config parameter '{name}'"))?;
            output::json_pretty(value)
        }
        None => output::json_pretty(&params),
    }
}
