//! The object model shared by every stored class.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::codec::Acl;

/// Members every stored object carries.
///
/// Embed it in a type with `#[serde(flatten)]`. Wire members that no field
/// of the type claims are kept in [`extra`](Self::extra) and sent back on
/// save.
///
/// ```
/// use parsekit::{ObjectBase, impl_parse_object};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct GameScore {
///     #[serde(flatten)]
///     base: ObjectBase,
///     player_name: String,
///     #[serde(rename = "points")]
///     score: i64,
///     #[serde(skip)]
///     dirty: bool,
/// }
///
/// impl_parse_object!(GameScore);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectBase {
    #[serde(rename = "objectId", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,

    #[serde(
        rename = "createdAt",
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::codec::date::option"
    )]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(
        rename = "updatedAt",
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::codec::date::option"
    )]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(rename = "ACL", default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<Acl>,

    /// Members not claimed by any field.
    #[serde(flatten, deserialize_with = "deserialize_extra")]
    pub extra: Map<String, Value>,
}

/// The tag and class name of an included object describe the object
/// itself; they are not members.
fn deserialize_extra<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Map<String, Value>, D::Error> {
    let mut extra = Map::deserialize(deserializer)?;
    extra.remove("__type");
    extra.remove("className");
    Ok(extra)
}

impl ObjectBase {
    /// Base for an object that already exists on the server.
    pub fn with_id(object_id: impl Into<String>) -> Self {
        Self {
            object_id: Some(object_id.into()),
            ..Self::default()
        }
    }

    /// Returns an unclaimed member.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Set an unclaimed member.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.extra.insert(key.into(), value)
    }
}

/// A type stored in a backend class.
///
/// Implement with [`impl_parse_object!`](crate::impl_parse_object).
pub trait ParseObject: Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static {
    /// The class this type maps to. Empty for [`Object`](crate::Object),
    /// whose class is chosen at runtime.
    const CLASS_NAME: &'static str;

    /// The class of this value.
    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    fn base(&self) -> &ObjectBase;

    fn base_mut(&mut self) -> &mut ObjectBase;

    /// Called after decoding with the class the value was read from.
    fn bind_class(&mut self, _class_name: &str) {}

    /// Shorthand for the object id.
    fn object_id(&self) -> Option<&str> {
        self.base().object_id.as_deref()
    }

    /// The REST collection this value is stored in.
    fn collection_path(&self) -> String {
        super::collection_path(self.class_name())
    }
}

/// Implement [`ParseObject`] for a struct with an embedded [`ObjectBase`].
///
/// The class name defaults to the type name. The base field defaults to
/// `base`.
///
/// ```
/// # use parsekit::{ObjectBase, impl_parse_object};
/// # use serde::{Deserialize, Serialize};
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Tag {
///     #[serde(flatten)]
///     meta: ObjectBase,
///     label: String,
/// }
///
/// impl_parse_object!(Tag, "Tags", meta);
/// ```
#[macro_export]
macro_rules! impl_parse_object {
    ($ty:ident) => {
        $crate::impl_parse_object!($ty, stringify!($ty), base);
    };
    ($ty:ty, $class:expr) => {
        $crate::impl_parse_object!($ty, $class, base);
    };
    ($ty:ty, $class:expr, $field:ident) => {
        impl $crate::ParseObject for $ty {
            const CLASS_NAME: &'static str = $class;

            fn base(&self) -> &$crate::ObjectBase {
                &self.$field
            }

            fn base_mut(&mut self) -> &mut $crate::ObjectBase {
                &mut self.$field
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{self, Date};
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct GameScore {
        #[serde(flatten)]
        base: ObjectBase,
        player_name: String,
        #[serde(rename = "points")]
        score: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cheat_mode: Option<bool>,
        #[serde(skip)]
        dirty: bool,
    }

    crate::impl_parse_object!(GameScore);

    #[test]
    fn class_defaults_to_type_name() {
        assert_eq!(GameScore::CLASS_NAME, "GameScore");
        assert_eq!(GameScore::default().class_name(), "GameScore");
    }

    #[test]
    fn collection_follows_class() {
        assert_eq!(GameScore::default().collection_path(), "classes/GameScore");
    }

    #[test]
    fn decodes_base_and_extras() {
        let score: GameScore = codec::decode(json!({
            "objectId": "Ed1nuqPvcm",
            "createdAt": "2011-08-20T02:06:57.931Z",
            "updatedAt": { "__type": "Date", "iso": "2011-08-21T18:02:52.248Z" },
            "playerName": "Sean Plott",
            "points": 1337,
            "dirty": true,
            "level": 7
        }))
        .unwrap();

        assert_eq!(score.object_id(), Some("Ed1nuqPvcm"));
        assert_eq!(
            Date::new(score.base.created_at.unwrap()).to_iso_string(),
            "2011-08-20T02:06:57.931Z"
        );
        assert!(score.base.updated_at.is_some());
        assert_eq!(score.score, 1337);
        assert!(!score.dirty);
        assert_eq!(score.base.get("level"), Some(&json!(7)));
        assert_eq!(score.base.get("dirty"), Some(&json!(true)));
    }

    #[test]
    fn included_object_drops_own_tag_but_keeps_nested_tags() {
        let score: GameScore = codec::decode(json!({
            "__type": "Object",
            "className": "GameScore",
            "objectId": "g1",
            "playerName": "Sean",
            "points": 3,
            "owner": {
                "__type": "Object",
                "className": "_User",
                "objectId": "u1",
                "username": "sean"
            }
        }))
        .unwrap();

        assert_eq!(score.object_id(), Some("g1"));
        assert!(score.base.get("__type").is_none());
        assert!(score.base.get("className").is_none());
        assert_eq!(score.base.get("owner").unwrap()["className"], "_User");
    }

    #[test]
    fn encode_keeps_extras_and_drops_server_members() {
        let mut score = GameScore {
            base: ObjectBase::with_id("abc"),
            player_name: "Sean".into(),
            score: 10,
            ..GameScore::default()
        };
        score.base.created_at = Some(Utc::now());
        score.base.insert("level", json!(3));

        let body = codec::encode(&score).unwrap();
        assert_eq!(
            Value::Object(body),
            json!({ "playerName": "Sean", "points": 10, "level": 3 })
        );
    }

    #[test]
    fn omitted_empty_field_is_not_sent() {
        let body = codec::encode(&GameScore::default()).unwrap();
        assert!(!body.contains_key("cheatMode"));
        assert!(!body.contains_key("ACL"));
    }
}
