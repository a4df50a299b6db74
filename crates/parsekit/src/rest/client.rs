//! REST HTTP client implementation.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, trace, warn};

use crate::auth::{ApplicationKeys, SessionToken};
use crate::error::{Error, InvalidInputError, RemoteError};
use crate::types::ServerUrl;

use super::endpoints::{
    APPLICATION_ID_HEADER, ErrorResponse, MASTER_KEY_HEADER, REST_API_KEY_HEADER,
    SESSION_TOKEN_HEADER,
};

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("parsekit/", env!("CARGO_PKG_VERSION"));

/// How a single request authenticates.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestAuth<'a> {
    /// Session bound to the caller, if any.
    pub session_token: Option<&'a SessionToken>,
    /// The caller asked for the master key.
    pub use_master_key: bool,
}

impl<'a> RequestAuth<'a> {
    pub fn new(session_token: Option<&'a SessionToken>, use_master_key: bool) -> Self {
        Self {
            session_token,
            use_master_key,
        }
    }
}

/// HTTP client for REST requests.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    server: ServerUrl,
    keys: ApplicationKeys,
}

impl RestClient {
    /// Create a new REST client for the given server.
    ///
    /// # Errors
    ///
    /// Returns an error if the user agent is not a valid header value or
    /// the HTTP client cannot be built.
    pub fn new(
        server: ServerUrl,
        keys: ApplicationKeys,
        user_agent: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self, Error> {
        let user_agent = HeaderValue::from_str(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .map_err(|_| InvalidInputError::HeaderValue {
                header: "User-Agent",
            })?;

        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            server,
            keys,
        })
    }

    /// Returns the server this client is configured for.
    pub fn server(&self) -> &ServerUrl {
        &self.server
    }

    pub fn keys(&self) -> &ApplicationKeys {
        &self.keys
    }

    /// Make a GET request with URL query parameters.
    #[instrument(skip(self, params, auth), fields(server = %self.server))]
    pub async fn get(
        &self,
        path: &str,
        params: &[(String, String)],
        auth: RequestAuth<'_>,
    ) -> Result<Value, Error> {
        let url = self.server.endpoint(path);
        debug!(path, "REST GET");
        trace!(?params, "query parameters");

        let response = self
            .client
            .get(&url)
            .query(params)
            .headers(self.headers(auth)?)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Make a POST request with a JSON body.
    #[instrument(skip(self, body, auth), fields(server = %self.server))]
    pub async fn post<B>(&self, path: &str, body: &B, auth: RequestAuth<'_>) -> Result<Value, Error>
    where
        B: Serialize + ?Sized,
    {
        let url = self.server.endpoint(path);
        debug!(path, "REST POST");

        let response = self
            .client
            .post(&url)
            .json(body)
            .headers(self.headers(auth)?)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Make a PUT request with a JSON body.
    #[instrument(skip(self, body, auth), fields(server = %self.server))]
    pub async fn put<B>(&self, path: &str, body: &B, auth: RequestAuth<'_>) -> Result<Value, Error>
    where
        B: Serialize + ?Sized,
    {
        let url = self.server.endpoint(path);
        debug!(path, "REST PUT");

        let response = self
            .client
            .put(&url)
            .json(body)
            .headers(self.headers(auth)?)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Make a DELETE request, discarding the response body.
    #[instrument(skip(self, auth), fields(server = %self.server))]
    pub async fn delete(&self, path: &str, auth: RequestAuth<'_>) -> Result<(), Error> {
        let url = self.server.endpoint(path);
        debug!(path, "REST DELETE");

        let response = self
            .client
            .delete(&url)
            .headers(self.headers(auth)?)
            .send()
            .await?;

        let status = response.status();
        trace!(status = %status, "REST response");
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Remote(self.parse_error_response(response).await))
        }
    }

    /// Build the key and session headers for a request.
    ///
    /// The master key is sent only when it was requested, one is
    /// configured, and no session is bound. Otherwise the REST key is sent
    /// along with the session token, if any.
    fn headers(&self, auth: RequestAuth<'_>) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        insert(&mut headers, APPLICATION_ID_HEADER, self.keys.application_id())?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match (self.keys.master_key(), auth.session_token) {
            (Some(master_key), None) if auth.use_master_key => {
                trace!("using master key");
                insert(&mut headers, MASTER_KEY_HEADER, master_key)?;
            }
            (_, session_token) => {
                if let Some(rest_api_key) = self.keys.rest_api_key() {
                    insert(&mut headers, REST_API_KEY_HEADER, rest_api_key)?;
                }
                if let Some(token) = session_token {
                    insert(&mut headers, SESSION_TOKEN_HEADER, token.as_str())?;
                }
            }
        }

        Ok(headers)
    }

    /// Handle a REST response, parsing the body or error.
    async fn handle_response(&self, response: reqwest::Response) -> Result<Value, Error> {
        let status = response.status();
        trace!(status = %status, "REST response");

        if status.is_success() {
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            Ok(serde_json::from_slice(&bytes)?)
        } else {
            Err(Error::Remote(self.parse_error_response(response).await))
        }
    }

    /// Parse a REST error response.
    async fn parse_error_response(&self, response: reqwest::Response) -> RemoteError {
        let status = response.status().as_u16();

        match response.json::<ErrorResponse>().await {
            Ok(body) => RemoteError::new(status, body.code, body.error),
            Err(err) => {
                warn!(status, error = %err, "unparsable error body");
                RemoteError::new(status, None, None)
            }
        }
    }
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), Error> {
    let invalid = || InvalidInputError::HeaderValue { header: name };
    let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    headers.insert(header, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(keys: ApplicationKeys) -> RestClient {
        RestClient::new(ServerUrl::new(crate::DEFAULT_SERVER_URL).unwrap(), keys, None, None).unwrap()
    }

    #[test]
    fn master_key_when_requested_and_no_session() {
        let client = client(ApplicationKeys::new("app", "rest").with_master_key("master"));
        let headers = client.headers(RequestAuth::new(None, true)).unwrap();
        assert_eq!(headers["x-parse-application-id"], "app");
        assert_eq!(headers["x-parse-master-key"], "master");
        assert!(!headers.contains_key("x-parse-rest-api-key"));
    }

    #[test]
    fn session_wins_over_master_key() {
        let client = client(ApplicationKeys::new("app", "rest").with_master_key("master"));
        let token = SessionToken::new("r:abc");
        let headers = client.headers(RequestAuth::new(Some(&token), true)).unwrap();
        assert!(!headers.contains_key("x-parse-master-key"));
        assert_eq!(headers["x-parse-rest-api-key"], "rest");
        assert_eq!(headers["x-parse-session-token"], "r:abc");
    }

    #[test]
    fn rest_key_when_master_key_missing() {
        let client = client(ApplicationKeys::new("app", "rest"));
        let headers = client.headers(RequestAuth::new(None, true)).unwrap();
        assert!(!headers.contains_key("x-parse-master-key"));
        assert_eq!(headers["x-parse-rest-api-key"], "rest");
    }

    #[test]
    fn invalid_header_value_is_rejected() {
        let client = client(ApplicationKeys::new("app", "rest"));
        let token = SessionToken::new("bad\ntoken");
        let err = client
            .headers(RequestAuth::new(Some(&token), false))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidInput(InvalidInputError::HeaderValue { .. })
        ));
    }
}
