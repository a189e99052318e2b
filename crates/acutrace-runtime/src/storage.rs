//! Owned key/value session storage.
//!
//! Values are plain strings, the way a browser session store holds them.
//! A file-backed store rewrites its whole JSON document on every change,
//! via a temp file and a rename.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use acutrace_core::error::{AcuTraceError, Result};
use tracing::{debug, warn};

/// `"true"` while a login is persisted.
pub const KEY_IS_AUTHENTICATED: &str = "isAuthenticated";
/// Identity of the logged-in analyst.
pub const KEY_USER_ID: &str = "userId";
/// Serialized most recent analysis response.
pub const KEY_ANALYSIS_RESULTS: &str = "analysisResults";

#[derive(Debug, Default)]
pub struct SessionStorage {
    entries: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl SessionStorage {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed store. A missing file is an empty session; a file
    /// that is not a JSON string map is discarded with a warning.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "corrupt session file ignored");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(AcuTraceError::Storage { path, source }),
        };
        debug!(path = %path.display(), keys = entries.len(), "session storage opened");
        Ok(Self {
            entries,
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.set_all([(key, value.into())])
    }

    /// Set several keys as one change. If persisting fails nothing is kept.
    pub fn set_all<'k>(&mut self, pairs: impl IntoIterator<Item = (&'k str, String)>) -> Result<()> {
        let previous = self.entries.clone();
        for (key, value) in pairs {
            self.entries.insert(key.to_string(), value);
        }
        self.commit(previous)
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        self.remove_all([key])
    }

    /// Remove several keys as one change. Absent keys are ignored.
    pub fn remove_all<'k>(&mut self, keys: impl IntoIterator<Item = &'k str>) -> Result<()> {
        let previous = self.entries.clone();
        let mut changed = false;
        for key in keys {
            changed |= self.entries.remove(key).is_some();
        }
        if !changed {
            return Ok(());
        }
        self.commit(previous)
    }

    // ── Private implementation ────────────────────────────────────────────

    /// Persist the current entries, restoring `previous` on failure.
    fn commit(&mut self, previous: BTreeMap<String, String>) -> Result<()> {
        if let Err(e) = self.persist() {
            self.entries = previous;
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let storage_err = |source: std::io::Error| AcuTraceError::Storage {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(storage_err)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(storage_err)?;
        std::fs::rename(&tmp, path).map_err(storage_err)?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
