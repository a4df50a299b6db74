//! Subcommand implementations.

pub mod call;
pub mod config;
pub mod configure;
pub mod delete;
pub mod get;
pub mod health;
pub mod query;

use anyhow::{Context, Result};
use parsekit::ClassName;

/// Parse a class name argument.
fn class_name(value: &str) -> Result<ClassName> {
    ClassName::new(value).with_context(|| format!("Invalid class name '{value}'"))
}
