//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};

use crate::commands::{call, config, configure, delete, get, health, query};

/// CLI tool for exploring Parse-compatible backends.
#[derive(Parser, Debug)]
#[command(name = "parse")]
#[command(author, version = env!("PARSEKIT_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection settings. Each overrides the saved profile.
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Application id
    #[arg(long, env = "PARSE_APPLICATION_ID", global = true)]
    pub app_id: Option<String>,

    /// REST API key
    #[arg(long, env = "PARSE_REST_API_KEY", global = true, hide_env_values = true)]
    pub rest_key: Option<String>,

    /// Master key, sent only by commands that ask for it
    #[arg(long, env = "PARSE_MASTER_KEY", global = true, hide_env_values = true)]
    pub master_key: Option<String>,

    /// Server URL, e.g. http://localhost:1337/parse
    #[arg(long, env = "PARSE_SERVER_URL", global = true)]
    pub server: Option<String>,

    /// Session token to send with every request
    #[arg(long, env = "PARSE_SESSION_TOKEN", global = true, hide_env_values = true)]
    pub session_token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save connection settings to the profile
    Configure(configure::ConfigureArgs),

    /// Check that the server is up
    Health(health::HealthArgs),

    /// Show the app's config parameters
    Config(config::ConfigArgs),

    /// Query objects of a class
    Query(query::QueryArgs),

    /// Fetch one object
    Get(get::GetArgs),

    /// Delete one object
    Delete(delete::DeleteArgs),

    /// Call a cloud function
    Call(call::CallArgs),
}
