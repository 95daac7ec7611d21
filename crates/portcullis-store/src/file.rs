//! JSON-file implementation of `DurableStore`.
//!
//! The whole store is one flat JSON object of string values. Every write
//! rewrites the file through a sibling temp file and a rename, so a crash
//! leaves either the old or the new contents on disk. The in-memory view
//! only changes once the write has landed.
//!
//! A file that cannot be parsed is treated as empty: the session mirror is
//! a cache, and a corrupt cache must not keep the console from starting.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use portcullis_contracts::error::{PortcullisError, PortcullisResult};
use portcullis_core::traits::DurableStore;

pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, loading existing entries if the file exists.
    ///
    /// Returns `PortcullisError::Storage` only when the file exists but
    /// cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> PortcullisResult<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => parse_entries(&path, &contents),
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(PortcullisError::Storage {
                    reason: format!("failed to read store file '{}': {}", path.display(), e),
                })
            }
        };

        debug!(path = %path.display(), entries = entries.len(), "opened file store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> PortcullisResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PortcullisError::Storage {
                reason: format!("failed to create '{}': {}", parent.display(), e),
            })?;
        }

        let body = serde_json::to_vec_pretty(entries).map_err(|e| PortcullisError::Storage {
            reason: format!("failed to encode store: {}", e),
        })?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, body).map_err(|e| PortcullisError::Storage {
            reason: format!("failed to write '{}': {}", tmp.display(), e),
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| PortcullisError::Storage {
            reason: format!("failed to replace '{}': {}", self.path.display(), e),
        })
    }
}

fn parse_entries(path: &Path, contents: &str) -> BTreeMap<String, String> {
    match serde_json::from_str::<serde_json::Value>(contents) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .filter_map(|(k, v)| match v {
                serde_json::Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect(),
        _ => {
            warn!(path = %path.display(), "store file is not a JSON object; starting empty");
            BTreeMap::new()
        }
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> PortcullisResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortcullisResult<()> {
        let mut entries = self.entries.lock();
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());
        self.flush(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> PortcullisResult<()> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.flush(&updated)?;
        *entries = updated;
        Ok(())
    }
}
