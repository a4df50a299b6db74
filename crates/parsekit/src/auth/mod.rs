//! Application keys and session binding.
//!
//! Requests authenticate with the app's [`ApplicationKeys`]. Operations on
//! behalf of a signed-in user go through a [`Session`], which adds the
//! user's [`SessionToken`].

mod keys;
mod session;
mod tokens;

pub use keys::ApplicationKeys;
pub use session::Session;
pub use tokens::SessionToken;
