//! Call command implementation.

use anyhow::{Context, Result};
use clap::Args;
use parsekit::ParseApi;
use serde_json::Value;

use crate::cli::ConnectionArgs;
use crate::connection;
use crate::output;

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Cloud function name
    pub name: String,

    /// Parameters as a JSON object
    #[arg(long, default_value = "{}")]
    pub params: String,
}

pub async fn run(args: CallArgs, connection: ConnectionArgs) -> Result<()> {
    let params: Value = serde_json::from_str(&args.params).context("--params is not valid JSON")?;

    let api = connection::connect(&connection)?;
    let result: Value = api
        .call_function(&args.name, &params)
        .await
        .with_context(|| format!("Function '{}' failed", args.name))?;

    output::json_pretty(&result)
}
