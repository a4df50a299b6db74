//! Session-bound access for a signed-in user.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::api::ParseApi;
use crate::client::Client;
use crate::error::Error;
use crate::query::decode_row;
use crate::rest::{RequestAuth, USERS_ME};
use crate::schema::ParseObject;

use super::tokens::SessionToken;

/// A client bound to a user's session token.
///
/// Every request made through a `Session` carries the session token and the
/// REST key. The master key is never sent, even when an operation asks for
/// it.
///
/// Sessions are cheap to clone (they use internal `Arc`) and are safe to
/// share across threads.
///
/// # Example
///
/// ```no_run
/// use parsekit::{ClientConfig, ParseApi, Query, Session, User};
///
/// # async fn example() -> Result<(), parsekit::Error> {
/// let client = ClientConfig::new("app-id", "rest-key").build()?;
/// let session = Session::from_token(client, "r:pnktnjyb996sj4p156gjtp4im");
///
/// let me: User = session.current_user().await?;
/// println!("signed in as {:?}", me.username);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    client: Client,
    token: SessionToken,
}

impl Session {
    /// Bind a session token obtained elsewhere, e.g. from a login on
    /// another client.
    pub fn from_token(client: Client, token: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                client,
                token: SessionToken::new(token),
            }),
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.inner.token
    }

    /// Fetch the user the session belongs to.
    #[instrument(skip(self), fields(server = %self.inner.client.server()))]
    pub async fn current_user<T: ParseObject>(&self) -> Result<T, Error> {
        let row = self
            .inner
            .client
            .rest()
            .get(USERS_ME, &[], RequestAuth::new(Some(&self.inner.token), false))
            .await?;
        debug!("fetched current user");
        decode_row(row, "_User")
    }
}

impl ParseApi for Session {
    fn client(&self) -> &Client {
        &self.inner.client
    }

    fn session_token(&self) -> Option<&SessionToken> {
        Some(&self.inner.token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("server", self.inner.client.server())
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_token() {
        let client = Client::new("app", "key").unwrap();
        let session = client.with_session("r:very_secret");
        let debug = format!("{session:?}");
        assert!(!debug.contains("very_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn session_is_bound_to_requests() {
        let session = Client::new("app", "key").unwrap().with_session("r:abc");
        let auth = session.auth(true);
        assert_eq!(auth.session_token.map(SessionToken::as_str), Some("r:abc"));
    }
}
