//! parsekit - Typed client for Parse-compatible backends
//!
//! This library maps Rust types onto backend classes and provides object
//! storage, a chainable query builder, paginated streaming, cloud function
//! calls and push notifications over the REST API.
//!
//! All operations live on the [`ParseApi`] trait, implemented by the
//! unauthenticated [`Client`] and by the session-bound [`Session`].
//!
//! # Example
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use parsekit::{ClientConfig, ObjectBase, ParseApi, Query, Update, impl_parse_object};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct GameScore {
//!     #[serde(flatten)]
//!     base: ObjectBase,
//!     player_name: String,
//!     score: i64,
//! }
//!
//! impl_parse_object!(GameScore);
//!
//! # async fn example() -> Result<(), parsekit::Error> {
//! let client = ClientConfig::new("app-id", "rest-key").build()?;
//!
//! let mut score = GameScore { player_name: "Sean".into(), score: 1337, ..Default::default() };
//! client.create(&mut score, false).await?;
//!
//! Update::new(&mut score).increment("score", 1).execute(&client).await?;
//!
//! let mut high_scores = client.stream(&Query::<GameScore>::new().greater_than("score", 1000))?;
//! while let Some(score) = high_scores.next().await {
//!     println!("{}", score?.player_name);
//! }
//! # Ok(())
//! # }
//! ```

mod api;
mod auth;
mod client;
pub mod codec;
pub mod error;
mod push;
pub mod query;
pub mod rest;
pub mod schema;
mod types;
mod update;

// Re-export primary types at crate root for convenience
pub use api::ParseApi;
pub use auth::{ApplicationKeys, Session, SessionToken};
pub use client::{Client, ClientConfig};
pub use codec::{Acl, Date, File, GeoPoint, Pointer, Reference};
pub use error::{
    ConfigurationError, DecodeError, Error, InvalidInputError, RemoteError, TransportError,
};
pub use push::PushNotification;
pub use query::{ObjectStream, Query, StreamHandle};
pub use schema::{ClassRegistry, DynObject, Installation, Object, ObjectBase, ParseObject, Role, User};
pub use types::{ClassName, DEFAULT_SERVER_URL, ServerUrl};
pub use update::Update;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
