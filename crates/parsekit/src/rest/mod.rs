//! REST transport layer.
//!
//! This module handles request execution against the backend's REST API:
//! header selection, JSON bodies, and response envelopes.

mod client;
mod endpoints;

pub use client::{DEFAULT_USER_AGENT, RequestAuth, RestClient};
pub use endpoints::*;
