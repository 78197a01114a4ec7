//! Configuration file and data directory layout.
//!
//! Everything the assistant persists lives under one directory:
//!
//! ```text
//! ~/.cbot/
//! ├── config.toml        # model variant, cache policy
//! ├── credentials.json   # API key blob
//! └── mcp.json           # question/answer cache blob
//! ```
//!
//! `CBOT_HOME` overrides the base directory, which keeps tests and
//! multi-profile setups away from the real one.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CbotError, Result};
use crate::providers::ModelVariant;

/// Top-level configuration, deserialized from `config.toml`.
///
/// Every field has a default so a missing file or a partial file both work.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Model variant used when a session starts.
    pub model: ModelVariant,
    /// MCP cache policy.
    pub mcp: McpConfig,
    /// Provider credentials and overrides.
    pub provider: ProviderConfig,
}

/// `[mcp]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// When `true`, every successfully answered question (without an
    /// attachment) is appended to the cache. Turning this off confines the
    /// cache to manually curated entries.
    pub auto_learn: bool,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self { auto_learn: true }
    }
}

/// `[provider]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    /// Explicit API key. Takes priority over the environment and the
    /// stored credential blob.
    pub api_key: Option<String>,
}

impl Config {
    /// Base data directory: `$CBOT_HOME` or `~/.cbot`.
    pub fn dir() -> PathBuf {
        if let Ok(home) = std::env::var("CBOT_HOME") {
            if !home.is_empty() {
                return PathBuf::from(home);
            }
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cbot")
    }

    /// Canonical config file path.
    pub fn path() -> PathBuf {
        Self::dir().join("config.toml")
    }

    /// Load configuration from the canonical path.
    ///
    /// A missing file yields the defaults; an unreadable or malformed file
    /// is an error (unlike the MCP blob, a broken config is worth stopping
    /// for — silently ignoring it would mask a typo in a hand-edited file).
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load from an explicit path (tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&raw)
            .map_err(|e| CbotError::Config(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.model, ModelVariant::Flash);
        assert!(config.mcp.auto_learn);
        assert!(config.provider.api_key.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = \"pro\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, ModelVariant::Pro);
        assert!(config.mcp.auto_learn);
    }

    #[test]
    fn test_full_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "model = \"pro\"\n[mcp]\nauto_learn = false\n[provider]\napi_key = \"k\"\n",
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, ModelVariant::Pro);
        assert!(!config.mcp.auto_learn);
        assert_eq!(config.provider.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [not toml").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(CbotError::Config(_))
        ));
    }
}
