//! Client configuration and the unauthenticated client.

use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

use crate::api::ParseApi;
use crate::auth::{ApplicationKeys, Session, SessionToken};
use crate::error::Error;
use crate::rest::RestClient;
use crate::schema::{ClassRegistry, DynObject, ParseObject};
use crate::types::{DEFAULT_SERVER_URL, ServerUrl};

/// Settings for building a [`Client`].
///
/// # Example
///
/// ```
/// use parsekit::ClientConfig;
/// use std::time::Duration;
///
/// let client = ClientConfig::new("app-id", "rest-key")
///     .server_url("http://localhost:1337/parse")
///     .timeout(Duration::from_secs(10))
///     .build()
///     .unwrap();
/// assert_eq!(client.server().as_str(), "http://localhost:1337/parse");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    keys: ApplicationKeys,
    server_url: Option<String>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
    registry: ClassRegistry,
}

impl ClientConfig {
    pub fn new(application_id: impl Into<String>, rest_api_key: impl Into<String>) -> Self {
        Self::from_keys(ApplicationKeys::new(application_id, rest_api_key))
    }

    pub fn from_keys(keys: ApplicationKeys) -> Self {
        Self {
            keys,
            server_url: None,
            user_agent: None,
            timeout: None,
            registry: ClassRegistry::new(),
        }
    }

    /// Enable requests that ask for the master key.
    pub fn master_key(mut self, master_key: impl Into<String>) -> Self {
        self.keys = self.keys.with_master_key(master_key);
        self
    }

    /// Server to talk to. Defaults to [`DEFAULT_SERVER_URL`].
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Timeout for each request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Register a type for decoding objects of its class.
    pub fn register<T: ParseObject>(mut self) -> Self {
        self.registry.register::<T>();
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid server URL or user agent.
    pub fn build(self) -> Result<Client, Error> {
        let server =
            ServerUrl::new(self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL))?;
        let rest = RestClient::new(server, self.keys, self.user_agent.as_deref(), self.timeout)?;
        debug!(server = %rest.server(), "client configured");

        Ok(Client {
            inner: Arc::new(ClientInner {
                rest,
                registry: RwLock::new(self.registry),
            }),
        })
    }
}

/// A client for one backend app.
///
/// Requests carry the application keys and no session. Bind a session
/// with [`Client::with_session`]. Clients are cheap to clone and several
/// can coexist, each with its own class registry.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    rest: RestClient,
    registry: RwLock<ClassRegistry>,
}

impl Client {
    /// Client for an app on the default server.
    pub fn new(application_id: impl Into<String>, rest_api_key: impl Into<String>) -> Result<Self, Error> {
        ClientConfig::new(application_id, rest_api_key).build()
    }

    pub fn rest(&self) -> &RestClient {
        &self.inner.rest
    }

    pub fn server(&self) -> &ServerUrl {
        self.inner.rest.server()
    }

    /// Register a type for decoding objects of its class.
    ///
    /// Registering the same type again has no further effect.
    pub fn register<T: ParseObject>(&self) {
        let mut registry = self
            .inner
            .registry
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        registry.register::<T>();
    }

    /// Decode an object of `class_name` into its registered type.
    pub fn decode_object(&self, class_name: &str, value: Value) -> Result<DynObject, Error> {
        let registry = self
            .inner
            .registry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        registry.decode_as(class_name, value)
    }

    /// Decode an object that names its own class, such as an included
    /// object found in another object's extension bag.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`](crate::DecodeError::Malformed)
    /// when the value carries no `className`.
    pub fn decode_dynamic(&self, value: Value) -> Result<DynObject, Error> {
        let registry = self
            .inner
            .registry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        registry.decode(value)
    }

    /// Bind a session token obtained elsewhere.
    pub fn with_session(&self, token: impl Into<String>) -> Session {
        Session::from_token(self.clone(), token)
    }
}

impl ParseApi for Client {
    fn client(&self) -> &Client {
        self
    }

    fn session_token(&self) -> Option<&SessionToken> {
        None
    }
}
