//! API-key persistence and resolution.
//!
//! The credential is its own blob under the data dir, independent of the MCP
//! cache: supplied once, reused on every start, replaced only on request.
//! Nothing is validated beyond non-emptiness — a wrong key is discovered when
//! the remote rejects a request.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;
use crate::error::Result;

/// On-disk shape of `credentials.json`.
#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialFile {
    api_key: Option<String>,
}

/// Plain-file credential store.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at the canonical location, `~/.cbot/credentials.json`.
    pub fn open_default() -> Self {
        Self::with_path(Config::dir().join("credentials.json"))
    }

    /// Store at a custom path (tests).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the stored key, if any.
    ///
    /// An absent, unreadable or unparsable file all read as "no key" — the
    /// caller prompts again, which is also the recovery path.
    pub fn load(&self) -> Option<String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read credential file: {}", e);
                return None;
            }
        };
        match serde_json::from_str::<CredentialFile>(&raw) {
            Ok(file) => file.api_key.filter(|k| !k.trim().is_empty()),
            Err(e) => {
                warn!("Failed to parse credential file: {}", e);
                None
            }
        }
    }

    /// Persist a key, replacing any previous one.
    pub fn save(&self, api_key: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let blob = serde_json::to_string_pretty(&CredentialFile {
            api_key: Some(api_key.to_string()),
        })?;
        std::fs::write(&self.path, blob)?;
        // The key grants API access; keep it out of other users' reach.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Remove the stored key. Returns `true` when something was deleted.
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

}

/// Resolve the API key in priority order.
///
/// 1. `explicit` — value from `config.toml`
/// 2. `env_key` — `GEMINI_API_KEY` or `GOOGLE_API_KEY`
/// 3. `stored` — the credential blob
pub fn resolve(
    explicit: Option<&str>,
    env_key: Option<&str>,
    stored: Option<String>,
) -> Option<String> {
    if let Some(k) = explicit.filter(|k| !k.trim().is_empty()) {
        return Some(k.to_string());
    }
    if let Some(k) = env_key.filter(|k| !k.trim().is_empty()) {
        return Some(k.to_string());
    }
    stored
}

/// [`resolve`] with the environment actually consulted.
pub fn resolve_api_key(config: &Config, store: &CredentialStore) -> Option<String> {
    let env_key = std::env::var("GEMINI_API_KEY")
        .or_else(|_| std::env::var("GOOGLE_API_KEY"))
        .ok();
    resolve(
        config.provider.api_key.as_deref(),
        env_key.as_deref(),
        store.load(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> CredentialStore {
        CredentialStore::with_path(dir.path().join("credentials.json"))
    }

    #[test]
    fn test_load_absent_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).load().is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save("AIza-test-key").unwrap();
        assert_eq!(store.load().as_deref(), Some("AIza-test-key"));
    }

    #[test]
    fn test_clear_removes_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save("k").unwrap();
        assert!(store.clear().unwrap());
        assert!(!store.clear().unwrap());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json at all").unwrap();
        assert!(CredentialStore::with_path(path).load().is_none());
    }

    #[test]
    fn test_resolution_priority() {
        assert_eq!(
            resolve(Some("cfg"), Some("env"), Some("stored".into())).as_deref(),
            Some("cfg")
        );
        assert_eq!(
            resolve(None, Some("env"), Some("stored".into())).as_deref(),
            Some("env")
        );
        assert_eq!(
            resolve(None, None, Some("stored".into())).as_deref(),
            Some("stored")
        );
        assert!(resolve(None, None, None).is_none());
        // Blank values do not shadow later sources
        assert_eq!(
            resolve(Some("  "), Some(""), Some("stored".into())).as_deref(),
            Some("stored")
        );
    }
}
