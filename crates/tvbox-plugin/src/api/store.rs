//! Per-plugin persistent key/value store.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use tvbox_core::error::{AppError, ErrorKind};
use tvbox_core::result::AppResult;

/// Key/value storage handed to a plugin through its context.
pub trait PluginStore: Send + Sync + fmt::Debug {
    /// Gets a value.
    fn get(&self, key: &str) -> Option<String>;
    /// Sets a value.
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    /// Removes a value. Returns whether it existed.
    fn remove(&self, key: &str) -> AppResult<bool>;
    /// Lists stored keys in order.
    fn keys(&self) -> Vec<String>;
}

/// Store persisted as one JSON object per plugin.
pub struct JsonFileStore {
    /// Backing file.
    path: PathBuf,
    /// In-memory copy; only changes that reached the file are applied.
    entries: Mutex<BTreeMap<String, String>>,
}

impl fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .finish()
    }
}

impl JsonFileStore {
    /// Opens the store at `path`, loading existing entries.
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read plugin store: {}", path.display()),
                    e,
                ));
            }
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&temp, &self.path).map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write plugin store: {}", self.path.display()),
                e,
            )
        })?;
        debug!(path = %self.path.display(), keys = entries.len(), "Plugin store saved");
        Ok(())
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::internal("Plugin store lock poisoned"))
    }
}

impl PluginStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut entries = self.lock()?;
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<bool> {
        let mut entries = self.lock()?;
        if !entries.contains_key(key) {
            return Ok(false);
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.persist(&updated)?;
        *entries = updated;
        Ok(true)
    }

    fn keys(&self) -> Vec<String> {
        self.lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Volatile store, for hosts without a data directory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl PluginStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.entries
            .lock()
            .map_err(|_| AppError::internal("Plugin store lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<bool> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| AppError::internal("Plugin store lock poisoned"))?
            .remove(key)
            .is_some())
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}
