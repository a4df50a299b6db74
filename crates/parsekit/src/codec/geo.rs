//! Geographic points.

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::malformed;

const KIND: &str = "GeoPoint";

/// A latitude/longitude pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns true when both coordinates are in range.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl Serialize for GeoPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("__type", KIND)?;
        map.serialize_entry("latitude", &self.latitude)?;
        map.serialize_entry("longitude", &self.longitude)?;
        map.end()
    }
}

struct GeoPointVisitor;

impl<'de> Visitor<'de> for GeoPointVisitor {
    type Value = GeoPoint;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a tagged GeoPoint object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<GeoPoint, A::Error> {
        let mut tag: Option<String> = None;
        let mut latitude: Option<f64> = None;
        let mut longitude: Option<f64> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "__type" => tag = Some(map.next_value()?),
                "latitude" => latitude = Some(map.next_value()?),
                "longitude" => longitude = Some(map.next_value()?),
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

        Ok(GeoPoint {
            latitude: latitude.ok_or_else(|| malformed(KIND, "missing latitude"))?,
            longitude: longitude.ok_or_else(|| malformed(KIND, "missing longitude"))?,
        })
    }
}

impl<'de> Deserialize<'de> for GeoPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(GeoPointVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use serde_json::json;

    #[test]
    fn wire_form() {
        assert_eq!(
            serde_json::to_value(GeoPoint::new(40.0, -30.0)).unwrap(),
            json!({ "__type": "GeoPoint", "latitude": 40.0, "longitude": -30.0 })
        );
    }

    #[test]
    fn integer_coordinates_widen() {
        let point: GeoPoint =
            decode(json!({ "__type": "GeoPoint", "latitude": 40, "longitude": -30 })).unwrap();
        assert_eq!(point, GeoPoint::new(40.0, -30.0));
    }

    #[test]
    fn range_check() {
        assert!(GeoPoint::new(90.0, 180.0).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
    }

    #[test]
    fn missing_coordinate_is_malformed() {
        let err = decode::<GeoPoint>(json!({ "__type": "GeoPoint", "latitude": 1.0 }))
            .unwrap_err();
        assert!(err.to_string().contains("missing longitude"));
    }
}
