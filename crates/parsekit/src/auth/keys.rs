//! Application keys.

use std::fmt;

/// The keys identifying an application to the backend.
///
/// # Security
///
/// The REST and master keys are never exposed in Debug output. The master
/// key bypasses every ACL; keep it out of client-side code.
///
/// # Example
///
/// ```
/// use parsekit::ApplicationKeys;
///
/// let keys = ApplicationKeys::new("app-id", "rest-key").with_master_key("s3cret");
/// assert_eq!(keys.application_id(), "app-id");
/// assert!(keys.has_master_key());
/// assert!(!format!("{keys:?}").contains("s3cret"));
/// ```
#[derive(Clone)]
pub struct ApplicationKeys {
    application_id: String,
    rest_api_key: Option<String>,
    master_key: Option<String>,
}

impl ApplicationKeys {
    /// Keys for requests made with the REST API key.
    pub fn new(application_id: impl Into<String>, rest_api_key: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            rest_api_key: Some(rest_api_key.into()),
            master_key: None,
        }
    }

    /// Keys for a server that only accepts the application id.
    pub fn application_only(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            rest_api_key: None,
            master_key: None,
        }
    }

    /// Add a master key.
    pub fn with_master_key(mut self, master_key: impl Into<String>) -> Self {
        self.master_key = Some(master_key.into());
        self
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn has_master_key(&self) -> bool {
        self.master_key.is_some()
    }

    /// Returns the REST API key for request headers.
    pub(crate) fn rest_api_key(&self) -> Option<&str> {
        self.rest_api_key.as_deref()
    }

    /// Returns the master key for request headers.
    pub(crate) fn master_key(&self) -> Option<&str> {
        self.master_key.as_deref()
    }
}

impl fmt::Debug for ApplicationKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ApplicationKeys")
            .field("application_id", &self.application_id)
            .field("rest_api_key", &redact(&self.rest_api_key))
            .field("master_key", &redact(&self.master_key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_hide_secrets_in_debug() {
        let keys = ApplicationKeys::new("my-app", "rest-secret").with_master_key("master-secret");
        let debug = format!("{:?}", keys);
        assert!(debug.contains("my-app"));
        assert!(!debug.contains("rest-secret"));
        assert!(!debug.contains("master-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn application_only_has_no_keys() {
        let keys = ApplicationKeys::application_only("my-app");
        assert!(keys.rest_api_key().is_none());
        assert!(!keys.has_master_key());
    }
}
