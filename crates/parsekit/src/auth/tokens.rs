//! Session token type.

use std::fmt;

/// A session token identifying a signed-in user.
///
/// Tokens are issued by the backend at login or signup and sent with every
/// request made through a [`Session`](crate::Session).
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Treat as opaque; do not parse or inspect
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a token obtained elsewhere.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in request headers.
    ///
    /// # Security
    ///
    /// Use only when constructing request headers or persisting the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionToken").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_token_hides_value_in_debug() {
        let token = SessionToken::new("r:secret_token_value");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("secret_token_value"));
        assert!(debug.contains("[REDACTED]"));
    }
}
