//! Client construction for commands.

use anyhow::{Context, Result};
use parsekit::{ApplicationKeys, Client, ClientConfig, ParseApi, Session, SessionToken};
use tracing::debug;

use crate::cli::ConnectionArgs;
use crate::profile::{self, Profile};

/// The client a command talks through, with or without a session.
#[derive(Debug, Clone)]
pub enum Connection {
    Client(Client),
    Session(Session),
}

impl ParseApi for Connection {
    fn client(&self) -> &Client {
        match self {
            Connection::Client(client) => client,
            Connection::Session(session) => session.client(),
        }
    }

    fn session_token(&self) -> Option<&SessionToken> {
        match self {
            Connection::Client(_) => None,
            Connection::Session(session) => Some(session.token()),
        }
    }
}

/// Build a client from the saved profile and any overrides.
pub fn connect(args: &ConnectionArgs) -> Result<Connection> {
    let profile = Profile::resolve(profile::load()?, args)?;
    debug!(?profile, "resolved profile");

    let client = build_client(&profile)?;
    Ok(match args.session_token {
        Some(ref token) => Connection::Session(client.with_session(token.clone())),
        None => Connection::Client(client),
    })
}

pub fn build_client(profile: &Profile) -> Result<Client> {
    let mut keys = match profile.rest_api_key {
        Some(ref rest_key) => ApplicationKeys::new(&profile.application_id, rest_key),
        None => ApplicationKeys::application_only(&profile.application_id),
    };
    if let Some(ref master_key) = profile.master_key {
        keys = keys.with_master_key(master_key);
    }

    let mut config = ClientConfig::from_keys(keys).user_agent(concat!(
        "parse-cli/",
        env!("PARSEKIT_VERSION")
    ));
    if let Some(ref server) = profile.server_url {
        config = config.server_url(server);
    }
    config.build().context("Invalid connection settings")
}
