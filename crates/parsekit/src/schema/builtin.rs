//! Built-in classes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::object::{ObjectBase, ParseObject};
use crate::codec;
use crate::error::Error;
use crate::types::ClassName;

/// A row of the `_User` class.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub base: ObjectBase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing)]
    pub email_verified: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_token: Option<String>,
}

impl User {
    /// The session token returned with the user, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("base", &self.base)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("email_verified", &self.email_verified)
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

crate::impl_parse_object!(User, "_User");

/// A row of the `_Installation` class: one app install on one device.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    #[serde(flatten)]
    pub base: ObjectBase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_type: Option<String>,

    #[serde(
        rename = "GCMSenderId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub gcm_sender_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_identifier: Option<String>,
}

crate::impl_parse_object!(Installation, "_Installation");

/// A row of the `_Role` class.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(flatten)]
    pub base: ObjectBase,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

crate::impl_parse_object!(Role, "_Role");

/// An object of any class, with every member kept in its base.
///
/// Used when the class is only known at runtime.
///
/// ```
/// use parsekit::{ClassName, Object};
///
/// let mut obj = Object::new(ClassName::new("GameScore").unwrap());
/// obj.set("score", 1337).unwrap();
/// assert_eq!(obj.get("score"), Some(&serde_json::json!(1337)));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(skip)]
    class_name: String,

    #[serde(flatten)]
    pub base: ObjectBase,
}

impl Object {
    pub fn new(class_name: ClassName) -> Self {
        Self {
            class_name: class_name.into(),
            base: ObjectBase::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.base.get(key)
    }

    /// Set a member, encoding the value to its wire form.
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) -> Result<(), Error> {
        self.base.insert(key, codec::to_wire(&value)?);
        Ok(())
    }
}

impl ParseObject for Object {
    const CLASS_NAME: &'static str = "";

    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn bind_class(&mut self, class_name: &str) {
        self.class_name = class_name.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use serde_json::json;

    #[test]
    fn user_keeps_session_token_out_of_body_and_debug() {
        let user: User = decode(json!({
            "objectId": "u1",
            "username": "cooldude6",
            "sessionToken": "r:pnktnjyb996sj4p156gjtp4im"
        }))
        .unwrap();
        assert_eq!(user.session_token(), Some("r:pnktnjyb996sj4p156gjtp4im"));
        assert!(!format!("{user:?}").contains("pnktnjyb"));

        let body = codec::encode(&user).unwrap();
        assert_eq!(Value::Object(body), json!({ "username": "cooldude6" }));
    }

    #[test]
    fn installation_field_names() {
        let install = Installation {
            device_type: Some("ios".into()),
            gcm_sender_id: Some("123".into()),
            channels: vec!["giants".into()],
            ..Installation::default()
        };
        assert_eq!(
            Value::Object(codec::encode(&install).unwrap()),
            json!({ "deviceType": "ios", "GCMSenderId": "123", "channels": ["giants"] })
        );
    }

    #[test]
    fn object_keeps_runtime_class() {
        let mut obj: Object = decode(json!({ "objectId": "x", "score": 1 })).unwrap();
        obj.bind_class("GameScore");
        assert_eq!(obj.class_name(), "GameScore");
        assert_eq!(obj.get("score"), Some(&json!(1)));
    }
}
