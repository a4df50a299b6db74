//! REST endpoint paths, headers and response envelopes.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::codec::kind_of;
use crate::error::{DecodeError, Error};

// ============================================================================
// Headers
// ============================================================================

pub const APPLICATION_ID_HEADER: &str = "X-Parse-Application-Id";

pub const REST_API_KEY_HEADER: &str = "X-Parse-REST-API-Key";

pub const MASTER_KEY_HEADER: &str = "X-Parse-Master-Key";

pub const SESSION_TOKEN_HEADER: &str = "X-Parse-Session-Token";

// ============================================================================
// Paths
// ============================================================================

/// The user bound to the current session token.
pub const USERS_ME: &str = "users/me";

pub const PUSH: &str = "push";

pub const HEALTH: &str = "health";

pub const CONFIG: &str = "config";

/// Path of a cloud function.
pub fn function_path(name: &str) -> String {
    format!("functions/{name}")
}

// ============================================================================
// Response Types
// ============================================================================

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response from creating an object.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    pub object_id: String,
    #[serde(default, with = "crate::codec::date::option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Response from updating an object.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    #[serde(default)]
    pub updated_at: Option<Value>,
}

/// Response from a cloud function call.
#[derive(Debug, Deserialize)]
pub struct FunctionResponse {
    #[serde(default)]
    pub result: Value,
}

/// Response from the config endpoint.
#[derive(Debug, Deserialize)]
pub struct ConfigResponse {
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// The shapes a query response can take.
#[derive(Debug)]
pub enum Envelope {
    /// `{"count":N}`, possibly alongside an empty `results`.
    Count(u64),
    /// A non-empty `{"results":[..]}`.
    Results(Vec<Value>),
    /// Any other object.
    Object(Map<String, Value>),
}

impl Envelope {
    /// Classify a query response body.
    ///
    /// `count` is checked before `results`; an empty `results` array is
    /// [`Error::NoRows`].
    pub fn parse(value: Value) -> Result<Self, Error> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(DecodeError::TypeMismatch {
                    message: format!("expected a response object, found {}", kind_of(&other)),
                }
                .into());
            }
        };

        if let Some(count) = map.get("count") {
            return count
                .as_u64()
                .map(Envelope::Count)
                .ok_or_else(|| {
                    DecodeError::TypeMismatch {
                        message: format!("expected a count, found {count}"),
                    }
                    .into()
                });
        }

        match map.remove("results") {
            Some(Value::Array(items)) if items.is_empty() => Err(Error::NoRows),
            Some(Value::Array(items)) => Ok(Envelope::Results(items)),
            Some(other) => Err(DecodeError::TypeMismatch {
                message: format!("expected results to be an array, found {}", kind_of(&other)),
            }
            .into()),
            None => Ok(Envelope::Object(map)),
        }
    }

    /// The result rows, or an error for any other shape.
    pub fn into_results(self) -> Result<Vec<Value>, Error> {
        match self {
            Envelope::Results(items) => Ok(items),
            Envelope::Count(_) => Err(DecodeError::TypeMismatch {
                message: "expected results, found a count".to_string(),
            }
            .into()),
            Envelope::Object(_) => Err(DecodeError::TypeMismatch {
                message: "expected results, found a bare object".to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn count_is_checked_before_results() {
        let envelope = Envelope::parse(json!({ "results": [], "count": 42 })).unwrap();
        assert!(matches!(envelope, Envelope::Count(42)));
    }

    #[test]
    fn empty_results_is_no_rows() {
        let err = Envelope::parse(json!({ "results": [] })).unwrap_err();
        assert!(err.is_no_rows());
    }

    #[test]
    fn results_are_returned_in_order() {
        let rows = Envelope::parse(json!({ "results": [{ "a": 1 }, { "a": 2 }] }))
            .unwrap()
            .into_results()
            .unwrap();
        assert_eq!(rows, vec![json!({ "a": 1 }), json!({ "a": 2 })]);
    }

    #[test]
    fn bare_object_passes_through() {
        let envelope = Envelope::parse(json!({ "objectId": "x" })).unwrap();
        assert!(matches!(envelope, Envelope::Object(map) if map.contains_key("objectId")));
    }
}
