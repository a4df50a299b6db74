//! Configure command implementation.

use anyhow::{Context, Result};
use clap::Args;
use parsekit::ParseApi;

use crate::cli::ConnectionArgs;
use crate::connection::build_client;
use crate::output;
use crate::profile::{self, Profile};

#[derive(Args, Debug)]
pub struct ConfigureArgs {
    /// Check the settings against the server's health endpoint first
    #[arg(long)]
    pub check: bool,
}

pub async fn run(args: ConfigureArgs, connection: ConnectionArgs) -> Result<()> {
    let profile = Profile::resolve(profile::load()?, &connection)?;

    // Fails early on a bad server URL
    let client = build_client(&profile)?;
    if args.check {
        client.health().await.context("Health check failed")?;
    }

    let path = profile::save(&profile).context("Failed to save profile")?;

    output::success("Profile saved");
    println!();
    output::field("Application", &profile.application_id);
    output::field("Server", client.server().as_str());
    output::field(
        "Master key",
        if profile.master_key.is_some() { "set" } else { "not set" },
    );
    output::field("Path", &path.display().to_string());

    Ok(())
}
