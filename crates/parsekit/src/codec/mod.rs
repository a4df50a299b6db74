//! Conversion between typed values and the backend's JSON wire form.
//!
//! Special values travel as tagged objects carrying a `__type` member:
//!
//! | Rust type          | Wire form                                                  |
//! |--------------------|------------------------------------------------------------|
//! | [`Date`]           | `{"__type":"Date","iso":"2014-12-20T18:31:19.123Z"}`       |
//! | [`Pointer`]        | `{"__type":"Pointer","className":"_User","objectId":"x"}`  |
//! | [`GeoPoint`]       | `{"__type":"GeoPoint","latitude":1.5,"longitude":2.5}`     |
//! | [`File`]           | `{"__type":"File","name":"a.png","url":"https://..."}`     |
//! | [`Acl`]            | `{"*":{"read":true},"role:admin":{"write":true}}`          |
//!
//! Encoding an object strips the server-managed members so they are never
//! sent back, and replaces included objects with pointers to them.
//! Decoding contains deserializer panics and reports them as errors.

mod acl;
pub mod date;
mod file;
mod geo;
mod pointer;

pub use acl::{Acl, Permissions};
pub use date::Date;
pub use file::File;
pub use geo::GeoPoint;
pub use pointer::{Pointer, Reference};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use serde_json::{Map, Value, json};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{DecodeError, Error};

/// Members the server assigns; never sent in a create or update body.
pub const RESERVED_KEYS: &[&str] = &[
    "objectId",
    "createdAt",
    "updatedAt",
    "sessionToken",
    "__type",
    "className",
];

const MALFORMED_PREFIX: &str = "malformed ";
const MALFORMED_SEPARATOR: &str = " value: ";

/// Build a deserializer error for a malformed tagged value.
///
/// The message shape is recognized by [`classify`] so it surfaces as
/// [`DecodeError::Malformed`] rather than a plain type mismatch.
pub(crate) fn malformed<E: serde::de::Error>(kind: &str, reason: impl fmt::Display) -> E {
    E::custom(format!(
        "{MALFORMED_PREFIX}{kind}{MALFORMED_SEPARATOR}{reason}"
    ))
}

/// Map a serde_json error onto the decode error taxonomy.
pub(crate) fn classify(err: &serde_json::Error) -> DecodeError {
    let full = err.to_string();
    // Parsing from text appends the position; values carry none.
    let message = if err.line() > 0 {
        full.rsplit_once(" at line ")
            .map(|(m, _)| m.to_string())
            .unwrap_or(full)
    } else {
        full
    };

    match err.classify() {
        Category::Data => {
            let parsed = message
                .strip_prefix(MALFORMED_PREFIX)
                .and_then(|rest| rest.split_once(MALFORMED_SEPARATOR));
            match parsed {
                Some((kind, reason)) => DecodeError::Malformed {
                    kind: kind.to_string(),
                    reason: reason.to_string(),
                },
                None => DecodeError::TypeMismatch { message },
            }
        }
        Category::Syntax | Category::Eof | Category::Io => DecodeError::Json { message },
    }
}

/// Encode a value as the wire form of an object body.
///
/// The value must serialize to a JSON object. Server-managed members are
/// removed and included objects become pointers, so decoded objects can be
/// saved again as they are.
///
/// # Example
///
/// ```
/// use parsekit::codec;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// #[serde(rename_all = "camelCase")]
/// struct GameScore {
///     player_name: String,
///     score: i64,
/// }
///
/// let body = codec::encode(&GameScore { player_name: "Sean".into(), score: 1337 }).unwrap();
/// assert_eq!(body["playerName"], "Sean");
/// ```
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Map<String, Value>, Error> {
    match to_wire(value)? {
        Value::Object(mut map) => {
            for key in RESERVED_KEYS {
                map.remove(*key);
            }
            Ok(map.into_iter().map(|(k, v)| (k, to_pointers(v))).collect())
        }
        other => Err(DecodeError::TypeMismatch {
            message: format!("expected an object, found {}", kind_of(&other)),
        }
        .into()),
    }
}

/// Encode any value to its wire form.
///
/// Used for query constraint values and cloud function parameters.
pub fn to_wire<T: Serialize + ?Sized>(value: &T) -> Result<Value, Error> {
    Ok(serde_json::to_value(value)?)
}

/// Decode a wire value into `T`.
///
/// A panic raised by a deserializer is returned as
/// [`DecodeError::Panicked`].
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    match panic::catch_unwind(AssertUnwindSafe(|| serde_json::from_value::<T>(value))) {
        Ok(result) => Ok(result?),
        Err(payload) => Err(DecodeError::Panicked {
            message: panic_message(payload),
        }
        .into()),
    }
}

/// Decode a wire value into an existing destination.
///
/// The destination is left untouched when decoding fails.
pub fn decode_into<T: DeserializeOwned>(value: Value, dst: &mut T) -> Result<(), Error> {
    *dst = decode(value)?;
    Ok(())
}

/// Replace included objects with pointers, recursively.
///
/// An object tagged `"__type":"Object"` is a full object embedded in place of
/// a pointer by a query `include`.
fn to_pointers(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.get("__type").and_then(Value::as_str) == Some("Object") {
                if let (Some(class_name), Some(object_id)) = (
                    map.get("className").and_then(Value::as_str),
                    map.get("objectId").and_then(Value::as_str),
                ) {
                    return json!({
                        "__type": "Pointer",
                        "className": class_name,
                        "objectId": object_id,
                    });
                }
            }
            Value::Object(map.into_iter().map(|(k, v)| (k, to_pointers(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(to_pointers).collect()),
        other => other,
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Score {
        #[serde(rename = "points")]
        score: i64,
        #[serde(skip)]
        scratch: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nickname: Option<String>,
    }

    #[test]
    fn renamed_field_uses_override_key() {
        let body = encode(&Score {
            score: 7,
            scratch: "ignored".into(),
            nickname: None,
        })
        .unwrap();
        assert_eq!(Value::Object(body), json!({ "points": 7 }));
    }

    #[test]
    fn renamed_field_decodes() {
        let score: Score = decode(json!({ "points": 7, "nickname": "ace" })).unwrap();
        assert_eq!(score.score, 7);
        assert_eq!(score.nickname.as_deref(), Some("ace"));
        assert!(score.scratch.is_empty());
    }

    #[test]
    fn encode_strips_server_members() {
        let body = encode(&json!({
            "objectId": "abc",
            "createdAt": "2015-01-01T00:00:00Z",
            "updatedAt": "2015-01-01T00:00:00Z",
            "sessionToken": "r:secret",
            "name": "kept"
        }))
        .unwrap();
        assert_eq!(Value::Object(body), json!({ "name": "kept" }));
    }

    #[test]
    fn encode_rejects_non_objects() {
        let err = encode(&5).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn type_mismatch_is_classified() {
        let err = decode::<Score>(json!({ "points": "seven" })).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn malformed_tag_is_classified() {
        let err = decode::<Date>(json!({ "__type": "Pointer", "iso": "x" })).unwrap_err();
        match err {
            Error::Decode(DecodeError::Malformed { kind, .. }) => assert_eq!(kind, "Date"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn syntax_error_is_json() {
        let err: Error = serde_json::from_str::<Value>("{not json").unwrap_err().into();
        assert!(matches!(err, Error::Decode(DecodeError::Json { .. })));
    }

    #[test]
    fn encode_sends_included_objects_as_pointers() {
        let body = encode(&json!({
            "owner": {
                "__type": "Object",
                "className": "_User",
                "objectId": "u1",
                "username": "sean"
            },
            "tags": [{ "__type": "Object", "className": "Tag", "objectId": "t1" }],
            "stats": { "wins": 3 }
        }))
        .unwrap();
        assert_eq!(
            Value::Object(body),
            json!({
                "owner": { "__type": "Pointer", "className": "_User", "objectId": "u1" },
                "tags": [{ "__type": "Pointer", "className": "Tag", "objectId": "t1" }],
                "stats": { "wins": 3 }
            })
        );
    }

    #[test]
    fn renamed_field_round_trips() {
        let original = Score {
            score: 42,
            scratch: "local only".into(),
            nickname: Some("ace".into()),
        };
        let decoded: Score = decode(Value::Object(encode(&original).unwrap())).unwrap();
        assert_eq!(
            decoded,
            Score {
                score: 42,
                scratch: String::new(),
                nickname: Some("ace".into()),
            }
        );
    }

    #[test]
    fn integers_widen_to_floats() {
        #[derive(Deserialize)]
        struct Ratio {
            value: f64,
            values: Vec<f64>,
        }

        let ratio: Ratio = decode(json!({ "value": 3, "values": [1, 2.5, -4] })).unwrap();
        assert_eq!(ratio.value, 3.0);
        assert_eq!(ratio.values, vec![1.0, 2.5, -4.0]);
    }

    #[test]
    fn decoder_panic_is_contained() {
        #[derive(Debug)]
        struct Explodes;

        impl<'de> Deserialize<'de> for Explodes {
            fn deserialize<D: serde::Deserializer<'de>>(_: D) -> Result<Self, D::Error> {
                panic!("boom")
            }
        }

        let err = decode::<Explodes>(json!({})).unwrap_err();
        match err {
            Error::Decode(DecodeError::Panicked { message }) => assert_eq!(message, "boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decode_into_leaves_destination_on_error() {
        let mut score = Score {
            score: 1,
            scratch: String::new(),
            nickname: None,
        };
        assert!(decode_into(json!({ "points": [] }), &mut score).is_err());
        assert_eq!(score.score, 1);
        decode_into(json!({ "points": 2 }), &mut score).unwrap();
        assert_eq!(score.score, 2);
    }
}
