//! Mapping Rust types onto backend classes.
//!
//! A type declares its class with [`impl_parse_object!`](crate::impl_parse_object)
//! and its field layout with serde attributes:
//!
//! - `#[serde(rename = "...")]` overrides a wire key
//! - `#[serde(skip)]` excludes a field
//! - `#[serde(skip_serializing_if = "...")]` omits empty values
//! - `#[serde(flatten)]` embeds [`ObjectBase`] or another struct
//!
//! [`ClassRegistry`] maps class names back to types when the class is only
//! known from the payload.

mod builtin;
mod object;
mod registry;

pub use builtin::{Installation, Object, Role, User};
pub use object::{ObjectBase, ParseObject};
pub use registry::{AnyObject, ClassRegistry, DynObject};

/// The collection path for a class: `users`, `installations`, `roles`, or
/// `classes/<name>`.
pub fn collection_path(class_name: &str) -> String {
    match class_name {
        "_User" => "users".to_string(),
        "_Installation" => "installations".to_string(),
        "_Role" => "roles".to_string(),
        other => format!("classes/{other}"),
    }
}

/// The path of one object.
pub fn object_path(class_name: &str, object_id: &str) -> String {
    format!("{}/{}", collection_path(class_name), object_id)
}
