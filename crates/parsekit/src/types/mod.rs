//! Validated primitive types.
//!
//! These types enforce backend naming rules at construction time.

mod class_name;
mod server_url;

pub use class_name::ClassName;
pub use server_url::{DEFAULT_SERVER_URL, ServerUrl};
