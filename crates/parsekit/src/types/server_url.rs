//! Server URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

/// Base URL of the hosted service, API version included.
pub const DEFAULT_SERVER_URL: &str = "https://api.parse.com/1";

/// A validated backend server URL.
///
/// This type ensures the URL is absolute, uses HTTPS (or HTTP for localhost),
/// and is normalized for endpoint construction. The path is the mount point
/// of the REST API, e.g. `/1` for the hosted service or `/parse` for a
/// self-hosted server.
///
/// # Example
///
/// ```
/// use parsekit::ServerUrl;
///
/// let server = ServerUrl::new("https://api.parse.com/1/").unwrap();
/// assert_eq!(server.endpoint("classes/GameScore"),
///            "https://api.parse.com/1/classes/GameScore");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServerUrl(Url);

impl ServerUrl {
    /// Create a new server URL from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not valid or doesn't meet requirements.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidInputError::ServerUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;

        let mut normalized = url;
        normalized.set_query(None);
        normalized.set_fragment(None);
        let trimmed = normalized.path().trim_end_matches('/').to_string();
        normalized.set_path(&trimmed);

        Ok(Self(normalized))
    }

    /// Returns the URL of an API path such as `classes/GameScore/abc`.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the inner URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        if url.cannot_be_a_base() {
            return Err(InvalidInputError::ServerUrl {
                value: original.to_string(),
                reason: "must be an absolute URL".to_string(),
            }
            .into());
        }

        let scheme = url.scheme();
        let is_localhost = url
            .host_str()
            .is_some_and(|h| h == "localhost" || h == "127.0.0.1" || h == "[::1]");

        if scheme != "https" && !(scheme == "http" && is_localhost) {
            return Err(InvalidInputError::ServerUrl {
                value: original.to_string(),
                reason: "must use HTTPS (HTTP allowed only for localhost)".to_string(),
            }
            .into());
        }

        if url.host_str().is_none() {
            return Err(InvalidInputError::ServerUrl {
                value: original.to_string(),
                reason: "must have a host".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServerUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ServerUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for ServerUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ServerUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for ServerUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_https_url() {
        let server = ServerUrl::new("https://api.parse.com/1").unwrap();
        assert_eq!(server.host(), Some("api.parse.com"));
    }

    #[test]
    fn valid_localhost_http() {
        let server = ServerUrl::new("http://localhost:1337/parse").unwrap();
        assert_eq!(
            server.endpoint("classes/GameScore"),
            "http://localhost:1337/parse/classes/GameScore"
        );
    }

    #[test]
    fn default_points_at_hosted_service() {
        assert_eq!(
            ServerUrl::new(DEFAULT_SERVER_URL).unwrap().endpoint("users"),
            "https://api.parse.com/1/users"
        );
    }

    #[test]
    fn normalizes_trailing_slash() {
        let server = ServerUrl::new("https://api.parse.com/1/").unwrap();
        assert_eq!(
            server.endpoint("/functions/hello"),
            "https://api.parse.com/1/functions/hello"
        );
    }

    #[test]
    fn root_mount_point() {
        let server = ServerUrl::new("https://parse.example.com").unwrap();
        assert_eq!(server.endpoint("health"), "https://parse.example.com/health");
    }

    #[test]
    fn invalid_http_non_localhost() {
        assert!(ServerUrl::new("http://api.parse.com/1").is_err());
    }

    #[test]
    fn invalid_relative_url() {
        assert!(ServerUrl::new("/classes/GameScore").is_err());
    }
}
