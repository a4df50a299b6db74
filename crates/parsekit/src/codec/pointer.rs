//! References to other objects.

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use super::malformed;
use crate::error::{Error, InvalidInputError};
use crate::schema::ParseObject;

const KIND: &str = "Pointer";

/// An untyped reference: a class name and an object id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pointer {
    class_name: String,
    object_id: String,
}

impl Pointer {
    /// Create a pointer to `object_id` in `class_name`.
    pub fn new(class_name: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            object_id: object_id.into(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }
}

impl Serialize for Pointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pointer(serializer, &self.class_name, &self.object_id)
    }
}

impl<'de> Deserialize<'de> for Pointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = deserializer.deserialize_map(PointerVisitor)?;
        if fields.tag.as_deref() != Some(KIND) {
            return Err(tag_error(fields.tag.as_deref()));
        }
        let class_name = fields
            .class_name
            .ok_or_else(|| malformed(KIND, "missing className"))?;
        let object_id = fields
            .object_id
            .ok_or_else(|| malformed(KIND, "missing objectId"))?;
        Ok(Self {
            class_name,
            object_id,
        })
    }
}

/// A typed reference to an object of class `T`.
///
/// Encodes as a pointer carrying `T`'s class name. Decodes from a pointer,
/// or from an included object (a query `include`), keeping only its id.
///
/// ```
/// use parsekit::{Reference, User};
///
/// let owner: Reference<User> = Reference::new("8TOXdXf3tz");
/// let wire = serde_json::to_value(&owner).unwrap();
/// assert_eq!(wire["className"], "_User");
/// ```
pub struct Reference<T> {
    object_id: String,
    _class: PhantomData<fn() -> T>,
}

impl<T> Reference<T> {
    /// Reference the object with the given id.
    pub fn new(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            _class: PhantomData,
        }
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }
}

impl<T: ParseObject> Reference<T> {
    /// Reference a persisted object.
    ///
    /// # Errors
    ///
    /// Fails when the object has no id yet.
    pub fn to(object: &T) -> Result<Self, Error> {
        let id = object
            .base()
            .object_id
            .as_deref()
            .ok_or(InvalidInputError::MissingObjectId {
                operation: "reference",
            })?;
        Ok(Self::new(id))
    }

    /// The referenced class.
    pub fn class_name(&self) -> &'static str {
        T::CLASS_NAME
    }

    /// Convert into an untyped pointer.
    pub fn into_pointer(self) -> Pointer {
        Pointer::new(T::CLASS_NAME, self.object_id)
    }
}

impl<T> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self::new(self.object_id.clone())
    }
}

impl<T> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.object_id == other.object_id
    }
}

impl<T> Eq for Reference<T> {}

impl<T> Hash for Reference<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.object_id.hash(state);
    }
}

impl<T: ParseObject> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("class_name", &T::CLASS_NAME)
            .field("object_id", &self.object_id)
            .finish()
    }
}

impl<T: ParseObject> Serialize for Reference<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pointer(serializer, T::CLASS_NAME, &self.object_id)
    }
}

impl<'de, T: ParseObject> Deserialize<'de> for Reference<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = deserializer.deserialize_map(PointerVisitor)?;
        match fields.tag.as_deref() {
            Some(KIND) => {
                if let Some(class) = fields.class_name.as_deref() {
                    if !T::CLASS_NAME.is_empty() && class != T::CLASS_NAME {
                        return Err(malformed(
                            KIND,
                            format!("expected className '{}', got '{}'", T::CLASS_NAME, class),
                        ));
                    }
                }
            }
            // An included object, tagged or already unwrapped.
            Some("Object") | None if fields.object_id.is_some() => {}
            other => return Err(tag_error(other)),
        }
        let object_id = fields
            .object_id
            .ok_or_else(|| malformed(KIND, "missing objectId"))?;
        Ok(Self::new(object_id))
    }
}

fn serialize_pointer<S: Serializer>(
    serializer: S,
    class_name: &str,
    object_id: &str,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(3))?;
    map.serialize_entry("__type", KIND)?;
    map.serialize_entry("className", class_name)?;
    map.serialize_entry("objectId", object_id)?;
    map.end()
}

fn tag_error<E: de::Error>(tag: Option<&str>) -> E {
    match tag {
        Some(other) => malformed(KIND, format!("unexpected __type '{other}'")),
        None => malformed(KIND, "missing __type"),
    }
}

#[derive(Default)]
struct PointerFields {
    tag: Option<String>,
    class_name: Option<String>,
    object_id: Option<String>,
}

struct PointerVisitor;

impl<'de> Visitor<'de> for PointerVisitor {
    type Value = PointerFields;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a tagged Pointer object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PointerFields, A::Error> {
        let mut fields = PointerFields::default();
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "__type" => fields.tag = Some(map.next_value()?),
                "className" => fields.class_name = Some(map.next_value()?),
                "objectId" => fields.object_id = Some(map.next_value()?),
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use crate::schema::User;
    use serde_json::json;

    #[test]
    fn pointer_wire_form() {
        let value = serde_json::to_value(Pointer::new("_User", "abcd")).unwrap();
        assert_eq!(
            value,
            json!({ "__type": "Pointer", "className": "_User", "objectId": "abcd" })
        );
    }

    #[test]
    fn pointer_requires_tag() {
        let err = decode::<Pointer>(json!({ "className": "_User", "objectId": "abcd" }))
            .unwrap_err();
        assert!(err.to_string().contains("missing __type"));
    }

    #[test]
    fn reference_encodes_class_of_target() {
        let owner: Reference<User> = Reference::new("abcd");
        assert_eq!(
            serde_json::to_value(&owner).unwrap(),
            json!({ "__type": "Pointer", "className": "_User", "objectId": "abcd" })
        );
    }

    #[test]
    fn reference_decodes_included_object() {
        let owner: Reference<User> = decode(json!({
            "__type": "Object",
            "className": "_User",
            "objectId": "abcd",
            "username": "sean"
        }))
        .unwrap();
        assert_eq!(owner.object_id(), "abcd");
    }

    #[test]
    fn reference_rejects_other_class() {
        let err = decode::<Reference<User>>(json!({
            "__type": "Pointer",
            "className": "GameScore",
            "objectId": "abcd"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("expected className '_User'"));
    }

    #[test]
    fn reference_rejects_wrong_tag() {
        let err = decode::<Reference<User>>(json!({ "__type": "Date", "objectId": "abcd" }))
            .unwrap_err();
        assert!(err.to_string().contains("unexpected __type 'Date'"));
    }
}
