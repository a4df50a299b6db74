//! parse - CLI tool for exploring Parse-compatible backends.
//!
//! This is a thin wrapper over the `parsekit` library, intended for manual
//! exploration and debugging of an app's data.

mod cli;
mod commands;
mod connection;
mod output;
mod profile;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use commands::{call, config, configure, delete, get, health, query};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.json_logs);

    let connection = cli.connection;
    match cli.command {
        Commands::Configure(args) => configure::run(args, connection).await,
        Commands::Health(args) => health::run(args, connection).await,
        Commands::Config(args) => config::run(args, connection).await,
        Commands::Query(args) => query::run(args, connection).await,
        Commands::Get(args) => get::run(args, connection).await,
        Commands::Delete(args) => delete::run(args, connection).await,
        Commands::Call(args) => call::run(args, connection).await,
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
