//! Runtime mapping from class names to Rust types.

use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::builtin::{Installation, Object, Role, User};
use super::object::{ObjectBase, ParseObject};
use crate::codec;
use crate::error::{DecodeError, Error};

/// Object-safe view of a [`ParseObject`].
pub trait AnyObject: Any + fmt::Debug + Send + Sync {
    fn class_name(&self) -> &str;
    fn base(&self) -> &ObjectBase;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: ParseObject> AnyObject for T {
    fn class_name(&self) -> &str {
        ParseObject::class_name(self)
    }

    fn base(&self) -> &ObjectBase {
        ParseObject::base(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// An object decoded through a [`ClassRegistry`].
///
/// Holds the registered type for its class, or an [`Object`] when the class
/// is not registered.
#[derive(Debug)]
pub struct DynObject(Box<dyn AnyObject>);

impl DynObject {
    pub fn class_name(&self) -> &str {
        self.0.class_name()
    }

    pub fn base(&self) -> &ObjectBase {
        self.0.base()
    }

    pub fn is<T: ParseObject>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    pub fn downcast_ref<T: ParseObject>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Take the concrete value, or get `self` back when it is another type.
    pub fn downcast<T: ParseObject>(self) -> Result<T, Self> {
        if self.is::<T>() {
            match self.0.into_any().downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(_) => unreachable!("type checked above"),
            }
        } else {
            Err(self)
        }
    }
}

type DecodeFn = Arc<dyn Fn(Value) -> Result<Box<dyn AnyObject>, Error> + Send + Sync>;

/// Class name to type table used for polymorphic decoding.
///
/// Each client owns one. The built-in classes are registered by default.
#[derive(Clone)]
pub struct ClassRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register::<User>()
            .register::<Installation>()
            .register::<Role>();
        registry
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<_> = self.decoders.keys().collect();
        classes.sort();
        f.debug_struct("ClassRegistry")
            .field("classes", &classes)
            .finish()
    }
}

impl ClassRegistry {
    /// Registry with the built-in classes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no classes at all.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register `T` under its class name, replacing any earlier entry.
    ///
    /// Types without a fixed class name are ignored.
    pub fn register<T: ParseObject>(&mut self) -> &mut Self {
        if !T::CLASS_NAME.is_empty() {
            let decode: DecodeFn = Arc::new(|value: Value| -> Result<Box<dyn AnyObject>, Error> {
                Ok(Box::new(codec::decode::<T>(value)?))
            });
            self.decoders.insert(T::CLASS_NAME.to_string(), decode);
        }
        self
    }

    pub fn is_registered(&self, class_name: &str) -> bool {
        self.decoders.contains_key(class_name)
    }

    /// Decode a value that names its own class, such as an included object.
    pub fn decode(&self, value: Value) -> Result<DynObject, Error> {
        let class_name = value
            .get("className")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DecodeError::Malformed {
                kind: "Object".to_string(),
                reason: "missing className".to_string(),
            })?;
        self.decode_as(&class_name, value)
    }

    /// Decode a value known to belong to `class_name`.
    pub fn decode_as(&self, class_name: &str, value: Value) -> Result<DynObject, Error> {
        let value = strip_class_tag(value);
        match self.decoders.get(class_name) {
            Some(decode) => Ok(DynObject(decode(value)?)),
            None => {
                let mut object: Object = codec::decode(value)?;
                object.bind_class(class_name);
                Ok(DynObject(Box::new(object)))
            }
        }
    }
}

fn strip_class_tag(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            map.remove("__type");
            map.remove("className");
            Value::Object(map)
        }
        other => other,
    }
}
