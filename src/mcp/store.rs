//! MCP persistence: pluggable raw-blob storage and the store on top of it.
//!
//! The blob is a JSON array of `{question, answer}` objects, loaded wholesale
//! and rewritten wholesale on every mutation. Storage and parse failures are
//! swallowed and logged — callers always get an empty or unchanged result,
//! never an error. The environment is effectively single-writer, so there is
//! no locking; a hypothetical concurrent writer would simply lose the race.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::config::Config;
use crate::error::Result;

use super::{normalize, McpEntry};

// ── Storage backends ─────────────────────────────────────────────────────────

/// Raw blob storage the cache sits on.
///
/// Implementations move bytes; the [`McpStore`] owns (de)serialization and
/// the swallow-and-log policy. Keeping the seam this low makes the store's
/// behaviour identical across backends, including how it treats corrupt data.
pub trait McpStorage: Send + Sync {
    /// Read the whole blob. `Ok(None)` when nothing has been stored yet.
    fn read(&self) -> Result<Option<String>>;

    /// Overwrite the whole blob.
    fn write(&self, blob: &str) -> Result<()>;
}

/// File-backed storage, the production default.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Canonical location: `~/.cbot/mcp.json`.
    pub fn default_path() -> PathBuf {
        Config::dir().join("mcp.json")
    }
}

impl McpStorage for JsonFileStorage {
    fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, blob: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, blob)?;
        Ok(())
    }
}

/// In-memory storage for tests and embedding.
#[derive(Default)]
pub struct MemoryStorage {
    blob: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl McpStorage for MemoryStorage {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.blob.lock().expect("mcp blob lock poisoned").clone())
    }

    fn write(&self, blob: &str) -> Result<()> {
        *self.blob.lock().expect("mcp blob lock poisoned") = Some(blob.to_string());
        Ok(())
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

/// The MCP cache store.
///
/// All operations are best-effort by contract: `load` returns an empty list
/// on any failure, `save` logs and drops failures. `append` enforces the
/// uniqueness invariant (no two entries with the same normalized question);
/// nothing is ever de-duplicated on load.
#[derive(Clone)]
pub struct McpStore {
    storage: Arc<dyn McpStorage>,
}

impl McpStore {
    /// Store over the default on-disk location.
    pub fn open_default() -> Self {
        Self::with_storage(Arc::new(JsonFileStorage::new(
            JsonFileStorage::default_path(),
        )))
    }

    /// Store over an explicit backend.
    pub fn with_storage(storage: Arc<dyn McpStorage>) -> Self {
        Self { storage }
    }

    /// Volatile store for tests and embedding.
    pub fn in_memory() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }

    /// Load all entries in insertion order.
    ///
    /// An absent blob yields an empty list. An unreadable or unparsable blob
    /// also yields an empty list, logged at warn — a broken cache must never
    /// take the assistant down.
    pub fn load(&self) -> Vec<McpEntry> {
        let blob = match self.storage.read() {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read MCP data: {}", e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&blob) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to parse MCP data, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Serialize and overwrite the whole stored list. Failures are logged
    /// and swallowed; the caller's view stays whatever it already was.
    pub fn save(&self, entries: &[McpEntry]) {
        let blob = match serde_json::to_string_pretty(entries) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Failed to serialize MCP data: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.write(&blob) {
            warn!("Failed to save MCP data: {}", e);
        }
    }

    /// Append one entry unless a same-normalized question already exists.
    ///
    /// Returns `true` when the entry was inserted. Load-append-save, not
    /// atomic; last writer wins.
    pub fn append(&self, entry: McpEntry) -> bool {
        let mut entries = self.load();
        let key = normalize(&entry.question);
        if entries.iter().any(|e| normalize(&e.question) == key) {
            return false;
        }
        entries.push(entry);
        self.save(&entries);
        true
    }

    /// Exact-match lookup. First match in insertion order wins.
    pub fn find(&self, question: &str) -> Option<String> {
        let key = normalize(question);
        self.load()
            .into_iter()
            .find(|entry| normalize(&entry.question) == key)
            .map(|entry| entry.answer)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
