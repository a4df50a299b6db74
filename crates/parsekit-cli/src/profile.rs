//! Profile storage for persisting connection settings.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::cli::ConnectionArgs;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Stored connection settings.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub application_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |key: &Option<String>| key.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Profile")
            .field("application_id", &self.application_id)
            .field("rest_api_key", &redacted(&self.rest_api_key))
            .field("master_key", &redacted(&self.master_key))
            .field("server_url", &self.server_url)
            .finish()
    }
}

impl Profile {
    /// Overlay command-line and environment settings onto a stored profile.
    pub fn resolve(stored: Option<Profile>, args: &ConnectionArgs) -> Result<Profile> {
        let stored = stored.unwrap_or_default();
        let application_id = args
            .app_id
            .clone()
            .or_else(|| Some(stored.application_id).filter(|id| !id.is_empty()))
            .context("No application id. Run 'parse configure' or pass --app-id.")?;

        Ok(Profile {
            application_id,
            rest_api_key: args.rest_key.clone().or(stored.rest_api_key),
            master_key: args.master_key.clone().or(stored.master_key),
            server_url: args.server.clone().or(stored.server_url),
        })
    }
}

/// Get the profile file path.
fn profile_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "parsekit").context("Could not determine config directory")?;

    let data_dir = dirs.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;

    Ok(data_dir.join("profile.json"))
}

/// Save a profile to disk.
pub fn save(profile: &Profile) -> Result<PathBuf> {
    let path = profile_path()?;
    let json = serde_json::to_string_pretty(profile)?;

    fs::write(&path, &json).context("Failed to write profile file")?;

    // Set restrictive permissions (Unix only)
    #[cfg(unix)]
    {
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&path, perms)?;
    }

    Ok(path)
}

/// Load the profile from disk, if one was saved.
pub fn load() -> Result<Option<Profile>> {
    let path = profile_path()?;

    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(&path).context("Failed to read profile file")?;
    let profile = serde_json::from_str(&json).context("Invalid profile file")?;
    Ok(Some(profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Profile {
        Profile {
            application_id: "stored-app".into(),
            rest_api_key: Some("stored-rest".into()),
            master_key: None,
            server_url: Some("https://example.com/parse".into()),
        }
    }

    #[test]
    fn arguments_override_stored_values() {
        let args = ConnectionArgs {
            rest_key: Some("arg-rest".into()),
            master_key: Some("arg-master".into()),
            ..Default::default()
        };
        let profile = Profile::resolve(Some(stored()), &args).unwrap();

        assert_eq!(profile.application_id, "stored-app");
        assert_eq!(profile.rest_api_key.as_deref(), Some("arg-rest"));
        assert_eq!(profile.master_key.as_deref(), Some("arg-master"));
        assert_eq!(profile.server_url.as_deref(), Some("https://example.com/parse"));
    }

    #[test]
    fn application_id_is_required() {
        assert!(Profile::resolve(None, &ConnectionArgs::default()).is_err());
    }

    #[test]
    fn debug_hides_keys() {
        let debug = format!("{:?}", stored());
        assert!(!debug.contains("stored-rest"));
        assert!(debug.contains("stored-app"));
    }
}
