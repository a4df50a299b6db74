//! Get command implementation.

use anyhow::{Context, Result};
use clap::Args;
use parsekit::{Object, ParseApi, Query};

use crate::cli::ConnectionArgs;
use crate::connection;
use crate::output;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Class of the object
    pub class: String,

    /// Object id
    pub object_id: String,

    /// Comma-separated fields to return
    #[arg(long, value_delimiter = ',')]
    pub keys: Vec<String>,

    /// Comma-separated pointer fields to include
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Send the master key
    #[arg(long)]
    pub master: bool,
}

pub async fn run(args: GetArgs, connection: ConnectionArgs) -> Result<()> {
    let api = connection::connect(&connection)?;

    let mut query = Query::<Object>::for_class(super::class_name(&args.class)?);
    if !args.keys.is_empty() {
        query = query.keys(&args.keys);
    }
    for path in &args.include {
        query = query.include(path);
    }
    if args.master {
        query = query.use_master_key();
    }

    let object = api
        .get_with(&query, &args.object_id)
        .await
        .with_context(|| format!("Failed to get {}/{}", args.class, args.object_id))?;

    output::json_pretty(&object)
}
