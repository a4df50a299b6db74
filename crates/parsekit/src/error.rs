//! Error types for the parsekit library.
//!
//! This module provides a unified error type with explicit variants for
//! transport, remote, decoding, configuration and input validation errors.

use std::fmt;
use thiserror::Error;

/// The unified error type for parsekit operations.
///
/// Every variant owns its data as plain values so the error can be cloned;
/// a pagination stream keeps a copy of its terminal error for later
/// inspection through its handle.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Network transport errors (connection, timeout, HTTP).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The backend answered with a non-2xx status.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// A query returned an empty result set.
    #[error("no results returned")]
    NoRows,

    /// A wire value could not be decoded into the destination type.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An invalid combination of request options.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Input validation errors (missing identifier, bad class name, bad URL).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns true for the "no rows" condition.
    ///
    /// Lets callers treat "not found" without treating it as a failure.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Error::NoRows)
    }

    /// Returns the backend error, if this error came from the server.
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            Error::Remote(remote) => Some(remote),
            _ => None,
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// An error reported by the backend.
///
/// The backend's numeric code and message are kept verbatim. Both are
/// absent when the error body could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// HTTP status code.
    pub status: u16,
    /// Backend error code (if present).
    pub code: Option<i64>,
    /// Error message from the server.
    pub message: Option<String>,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(code) = self.code {
            write!(f, " [code {}]", code)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {}

impl RemoteError {
    /// Create a new remote error.
    pub fn new(status: u16, code: Option<i64>, message: Option<String>) -> Self {
        Self {
            status,
            code,
            message,
        }
    }

    /// Backend code for "object not found".
    pub const OBJECT_NOT_FOUND: i64 = 101;

    /// Backend code for an invalid session token.
    pub const INVALID_SESSION_TOKEN: i64 = 209;

    /// Check if the backend reported a missing object.
    pub fn is_not_found(&self) -> bool {
        self.code == Some(Self::OBJECT_NOT_FOUND) || self.status == 404
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401 || self.code == Some(Self::INVALID_SESSION_TOKEN)
    }
}

/// Errors raised while decoding wire values.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// A tagged wire object is malformed (missing or wrong `__type`,
    /// missing members, unparsable date).
    #[error("malformed {kind} value: {reason}")]
    Malformed { kind: String, reason: String },

    /// The wire value does not fit the destination type.
    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },

    /// The body is not valid JSON.
    #[error("invalid JSON: {message}")]
    Json { message: String },

    /// A deserializer panicked; the panic was contained.
    #[error("decoder panicked: {message}")]
    Panicked { message: String },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(crate::codec::classify(&err))
    }
}

/// Invalid combinations of request options.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// Streaming owns ordering and paging.
    #[error("cannot stream a query with a sort, limit, or skip")]
    PagingWithStream,

    /// A push notification may expire at a time or after an interval, not both.
    #[error("cannot use both expiration_time and expiration_interval")]
    ConflictingExpiration,
}

/// Input validation errors.
#[derive(Debug, Clone, Error)]
pub enum InvalidInputError {
    /// The object has not been persisted yet.
    #[error("{operation} requires an object with an objectId")]
    MissingObjectId { operation: &'static str },

    /// Invalid class name.
    #[error("invalid class name '{value}': {reason}")]
    ClassName { value: String, reason: String },

    /// Invalid cloud function name.
    #[error("invalid function name '{value}': {reason}")]
    FunctionName { value: String, reason: String },

    /// Invalid server URL.
    #[error("invalid server URL '{value}': {reason}")]
    ServerUrl { value: String, reason: String },

    /// A key or token contains characters not allowed in a header.
    #[error("invalid header value for {header}")]
    HeaderValue { header: &'static str },
}
