//! Date values.
//!
//! Besides the [`Date`] type this module works as a `serde(with)` adapter
//! for plain `chrono` timestamps:
//!
//! ```
//! use chrono::{DateTime, Utc};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Match {
//!     #[serde(with = "parsekit::codec::date")]
//!     kickoff: DateTime<Utc>,
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::malformed;

const KIND: &str = "Date";

/// A timestamp in the backend's tagged date form.
///
/// Serializes as `{"__type":"Date","iso":"..."}` with millisecond precision
/// in UTC. Deserializes from the tagged form or from a bare RFC 3339 string
/// (the form used for `createdAt` and `updatedAt`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date(DateTime<Utc>);

impl Date {
    /// Wrap a UTC timestamp.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// The current time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the wrapped timestamp.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unwrap into the timestamp.
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }

    /// The `iso` member as sent on the wire, e.g. `2014-12-20T18:31:19.123Z`.
    pub fn to_iso_string(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(|dt| Self(dt.with_timezone(&Utc)))
    }
}

impl From<DateTime<Utc>> for Date {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl From<Date> for DateTime<Utc> {
    fn from(date: Date) -> Self {
        date.0
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("__type", KIND)?;
        map.serialize_entry("iso", &self.to_iso_string())?;
        map.end()
    }
}

struct DateVisitor;

impl<'de> Visitor<'de> for DateVisitor {
    type Value = Date;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a tagged Date object or an RFC 3339 string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Date, E> {
        Date::parse(v).map_err(|e| malformed(KIND, format!("cannot parse '{v}': {e}")))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Date, A::Error> {
        let mut tag: Option<String> = None;
        let mut iso: Option<String> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "__type" => tag = Some(map.next_value()?),
                "iso" => iso = Some(map.next_value()?),
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        match tag.as_deref() {
            Some(KIND) => {}
            Some(other) => return Err(malformed(KIND, format!("unexpected __type '{other}'"))),
            None => return Err(malformed(KIND, "missing __type")),
        }

        let iso = iso.ok_or_else(|| malformed(KIND, "missing iso"))?;
        self.visit_str(&iso)
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DateVisitor)
    }
}

/// `serde(with)` serializer for `DateTime<Utc>`.
pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    Date(*at).serialize(serializer)
}

/// `serde(with)` deserializer for `DateTime<Utc>`.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    Date::deserialize(deserializer).map(Date::into_inner)
}

/// `serde(with)` adapter for `Option<DateTime<Utc>>`.
pub mod option {
    use super::Date;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        at: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        at.map(Date::new).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<Date>::deserialize(deserializer)?.map(Date::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use chrono::TimeZone;
    use serde_json::{Value, json};

    fn sample() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 12, 20, 18, 31, 19).unwrap()
            + chrono::Duration::milliseconds(123)
    }

    #[test]
    fn encodes_tagged_with_millis() {
        let value = serde_json::to_value(Date::new(sample())).unwrap();
        assert_eq!(
            value,
            json!({ "__type": "Date", "iso": "2014-12-20T18:31:19.123Z" })
        );
    }

    #[test]
    fn whole_seconds_keep_millis() {
        let at = Utc.with_ymd_and_hms(2015, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(Date::new(at).to_iso_string(), "2015-01-02T03:04:05.000Z");
    }

    #[test]
    fn decodes_tagged_form() {
        let date: Date = decode(json!({ "__type": "Date", "iso": "2014-12-20T18:31:19.123Z" }))
            .unwrap();
        assert_eq!(date.into_inner(), sample());
    }

    #[test]
    fn decodes_bare_string() {
        let date: Date = decode(json!("2014-12-20T18:31:19.123Z")).unwrap();
        assert_eq!(date.into_inner(), sample());
    }

    #[test]
    fn missing_tag_is_malformed() {
        let err = decode::<Date>(json!({ "iso": "2014-12-20T18:31:19.123Z" })).unwrap_err();
        assert!(err.to_string().contains("missing __type"));
    }

    #[test]
    fn unparsable_iso_is_malformed() {
        let err = decode::<Date>(json!({ "__type": "Date", "iso": "yesterday" })).unwrap_err();
        assert!(err.to_string().starts_with("decode error: malformed Date value"));
    }

    #[test]
    fn with_adapter_round_trips() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Match {
            #[serde(with = "crate::codec::date")]
            kickoff: DateTime<Utc>,
            #[serde(default, with = "crate::codec::date::option")]
            ended: Option<DateTime<Utc>>,
        }

        let value = serde_json::to_value(Match {
            kickoff: sample(),
            ended: None,
        })
        .unwrap();
        assert_eq!(value["kickoff"]["__type"], "Date");
        assert_eq!(value["ended"], Value::Null);

        let back: Match = decode(value).unwrap();
        assert_eq!(back.kickoff, sample());
        assert_eq!(back.ended, None);
    }
}
