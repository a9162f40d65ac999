//! Durable key-value records and the adapter that mirrors a value into one.
//!
//! A [`Persisted`] value is read once when it is loaded and written back in
//! full on every [`Persisted::set`]. Reads that fail or do not parse fall
//! back to the caller's default; writes that fail are logged and otherwise
//! ignored, so the in-memory value stays authoritative for the session.

use std::fs;
use std::io;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Record name the roster is kept under unless configured otherwise.
pub const DEFAULT_KEY: &str = "minions";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on record '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage quota exceeded writing '{key}'")]
    QuotaExceeded { key: String },
}

/// A named-record store. Values are opaque strings.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// One `<key>.json` file per record inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        // Write beside the target and rename over it so readers never see a torn record.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// In-process store, mostly for tests. Can be told to reject writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: IndexMap<String, String>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, key: &str, value: &str) -> Self {
        self.records.insert(key.to_string(), value.to_string());
        self
    }

    /// When set, every write fails with [`StoreError::QuotaExceeded`].
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.records.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::QuotaExceeded {
                key: key.to_string(),
            });
        }
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.records.shift_remove(key);
        Ok(())
    }
}

/// A value mirrored into a named record of `S`.
#[derive(Debug)]
pub struct Persisted<T, S> {
    storage: S,
    key: String,
    value: T,
    pretty: bool,
}

impl<T, S> Persisted<T, S>
where
    T: Serialize + DeserializeOwned,
    S: Storage,
{
    /// Read `key` from `storage`; anything missing or unreadable yields `default`.
    pub fn load(storage: S, key: impl Into<String>, default: T) -> Self {
        let key = key.into();
        let value = match storage.get(&key) {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(value) => {
                    debug!(%key, bytes = text.len(), "loaded persisted record");
                    value
                }
                Err(e) => {
                    warn!(%key, error = %e, "persisted record is malformed; using default");
                    default
                }
            },
            Ok(None) => {
                debug!(%key, "no persisted record; using default");
                default
            }
            Err(e) => {
                warn!(%key, error = %e, "failed to read persisted record; using default");
                default
            }
        };
        Self {
            storage,
            key,
            value,
            pretty: false,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Replace the value and mirror it to storage. A failed write is logged
    /// and dropped; the new value is kept either way.
    pub fn set(&mut self, value: T) {
        self.value = value;
        if let Err(e) = self.flush() {
            error!(key = %self.key, error = %e, "error saving to storage");
        }
    }

    /// Write the current value, surfacing any failure.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let text = if self.pretty {
            serde_json::to_string_pretty(&self.value)?
        } else {
            serde_json::to_string(&self.value)?
        };
        self.storage.set(&self.key, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_default_when_empty() {
        let p: Persisted<String, _> =
            Persisted::load(MemoryStorage::new(), "test-key", "default".into());
        assert_eq!(p.value(), "default");
    }

    #[test]
    fn loads_stored_value() {
        let store = MemoryStorage::new().with_record("test-key", "\"stored-value\"");
        let p: Persisted<String, _> = Persisted::load(store, "test-key", "default".into());
        assert_eq!(p.value(), "stored-value");
    }

    #[test]
    fn malformed_record_falls_back() {
        let store = MemoryStorage::new().with_record("test-key", "{not json");
        let p: Persisted<Vec<i32>, _> = Persisted::load(store, "test-key", vec![1]);
        assert_eq!(p.value(), &vec![1]);
    }

    #[test]
    fn set_writes_through() {
        let mut p: Persisted<String, _> =
            Persisted::load(MemoryStorage::new(), "test-key", "initial".into());
        p.set("updated".into());
        assert_eq!(
            p.storage().get("test-key").unwrap().as_deref(),
            Some("\"updated\"")
        );
    }

    #[test]
    fn failed_write_keeps_value() {
        let mut store = MemoryStorage::new();
        store.set_fail_writes(true);
        let mut p: Persisted<i32, _> = Persisted::load(store, "n", 0);
        p.set(5);
        assert_eq!(*p.value(), 5);
        assert!(matches!(p.flush(), Err(StoreError::QuotaExceeded { .. })));
        assert_eq!(p.storage().get("n").unwrap(), None);
    }

    #[test]
    fn memory_remove_keeps_order() {
        let mut store = MemoryStorage::new()
            .with_record("a", "1")
            .with_record("b", "2")
            .with_record("c", "3");
        store.remove("b").unwrap();
        assert_eq!(store.keys().collect::<Vec<_>>(), ["a", "c"]);
    }
}
