//! Access control lists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const PUBLIC: &str = "*";
const ROLE_PREFIX: &str = "role:";

/// Read and write flags for one ACL entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default, skip_serializing_if = "is_false")]
    pub read: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub write: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Permissions {
    fn is_empty(&self) -> bool {
        !self.read && !self.write
    }
}

/// Per-object access control.
///
/// Entries are keyed by `*` (everyone), a user id, or `role:<name>`.
/// Entries that grant nothing are left out of the wire form.
///
/// ```
/// use parsekit::Acl;
///
/// let mut acl = Acl::new();
/// acl.set_public_read_access(true);
/// acl.set_role_write_access("admins", true);
/// assert_eq!(
///     serde_json::to_string(&acl).unwrap(),
///     r#"{"*":{"read":true},"role:admins":{"write":true}}"#
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Acl {
    entries: BTreeMap<String, Permissions>,
}

impl Acl {
    /// An empty ACL; only the master key can access the object.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn public_read_access(&self) -> bool {
        self.get(PUBLIC).read
    }

    pub fn public_write_access(&self) -> bool {
        self.get(PUBLIC).write
    }

    pub fn set_public_read_access(&mut self, allowed: bool) -> &mut Self {
        self.update(PUBLIC.to_string(), |p| p.read = allowed)
    }

    pub fn set_public_write_access(&mut self, allowed: bool) -> &mut Self {
        self.update(PUBLIC.to_string(), |p| p.write = allowed)
    }

    pub fn read_access(&self, user_id: &str) -> bool {
        self.get(user_id).read
    }

    pub fn write_access(&self, user_id: &str) -> bool {
        self.get(user_id).write
    }

    pub fn set_read_access(&mut self, user_id: impl Into<String>, allowed: bool) -> &mut Self {
        self.update(user_id.into(), |p| p.read = allowed)
    }

    pub fn set_write_access(&mut self, user_id: impl Into<String>, allowed: bool) -> &mut Self {
        self.update(user_id.into(), |p| p.write = allowed)
    }

    pub fn role_read_access(&self, role: &str) -> bool {
        self.get(&role_key(role)).read
    }

    pub fn role_write_access(&self, role: &str) -> bool {
        self.get(&role_key(role)).write
    }

    pub fn set_role_read_access(&mut self, role: &str, allowed: bool) -> &mut Self {
        self.update(role_key(role), |p| p.read = allowed)
    }

    pub fn set_role_write_access(&mut self, role: &str, allowed: bool) -> &mut Self {
        self.update(role_key(role), |p| p.write = allowed)
    }

    /// Iterate over the entries as `(key, permissions)`.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Permissions)> {
        self.entries.iter().map(|(k, p)| (k.as_str(), *p))
    }

    fn get(&self, key: &str) -> Permissions {
        self.entries.get(key).copied().unwrap_or_default()
    }

    fn update(&mut self, key: String, f: impl FnOnce(&mut Permissions)) -> &mut Self {
        let entry = self.entries.entry(key.clone()).or_default();
        f(entry);
        if entry.is_empty() {
            self.entries.remove(&key);
        }
        self
    }
}

fn role_key(role: &str) -> String {
    format!("{ROLE_PREFIX}{role}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use serde_json::json;

    #[test]
    fn public_read_only() {
        let mut acl = Acl::new();
        acl.set_public_read_access(true);
        assert_eq!(
            serde_json::to_value(&acl).unwrap(),
            json!({ "*": { "read": true } })
        );
    }

    #[test]
    fn user_and_role_entries() {
        let mut acl = Acl::new();
        acl.set_read_access("u1", true)
            .set_write_access("u1", true)
            .set_role_read_access("mods", true);
        assert_eq!(
            serde_json::to_value(&acl).unwrap(),
            json!({
                "u1": { "read": true, "write": true },
                "role:mods": { "read": true }
            })
        );
    }

    #[test]
    fn revoking_everything_drops_entry() {
        let mut acl = Acl::new();
        acl.set_write_access("u1", true);
        acl.set_write_access("u1", false);
        assert_eq!(serde_json::to_value(&acl).unwrap(), json!({}));
    }

    #[test]
    fn decodes_wire_form() {
        let acl: Acl = decode(json!({
            "*": { "read": true },
            "role:admins": { "read": true, "write": true }
        }))
        .unwrap();
        assert!(acl.public_read_access());
        assert!(!acl.public_write_access());
        assert!(acl.role_write_access("admins"));
        assert!(!acl.read_access("someone"));
    }
}
