use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

pub const PLAYERS_KEY: &str = "players";
pub const LOG_KEY: &str = "transactionLog";
pub const THEME_KEY: &str = "isDarkTheme";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage i/o on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed storage file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// String-keyed, string-valued persistence used by the ledger store.
///
/// Values are already serialized by the caller, so a provider only has to
/// keep bytes around between runs.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
}

/// Volatile provider; state is gone when the value is dropped.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Provider backed by one JSON document mapping keys to serialized values.
///
/// Every `set` rewrites the whole document through a temp file and a rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the document at `path`; a missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|source| StorageError::Malformed {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = entries.len(), "opened file store");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let mut buf = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            StorageError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        buf.push('\n');
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, buf).map_err(io_err(&tmp_path))?;
        fs::rename(&tmp_path, &self.path).map_err(io_err(&self.path))?;
        Ok(())
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError {
    let path = path.to_path_buf();
    move |source| StorageError::Io { path, source }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        self.flush()?;
        debug!(key, path = %self.path.display(), "persisted key");
        Ok(())
    }
}

/// Memory provider whose writes can be made to fail per key. Clones share
/// the set of failing keys, so a test can keep a handle after handing the
/// provider to a store.
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub(crate) struct FailingStore {
    inner: MemoryStore,
    failing: std::rc::Rc<std::cell::RefCell<Vec<&'static str>>>,
}

#[cfg(test)]
impl FailingStore {
    pub(crate) fn fail_on(&self, key: &'static str) {
        self.failing.borrow_mut().push(key);
    }
}

#[cfg(test)]
impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        if self.failing.borrow().iter().any(|k| *k == key) {
            return Err(StorageError::Io {
                path: PathBuf::from(key),
                source: std::io::Error::new(std::io::ErrorKind::Other, "write refused"),
            });
        }
        self.inner.set(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_returns_what_was_set() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get(THEME_KEY).unwrap(), None);
        store.set(THEME_KEY, "true".into()).unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn file_store_survives_reopen() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("islands.json");
        {
            let mut store = FileStore::open(&path).unwrap();
            store.set(LOG_KEY, "[\"a\",\"b\"]".into()).unwrap();
            store.set(THEME_KEY, "false".into()).unwrap();
        }
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(LOG_KEY).unwrap().as_deref(), Some("[\"a\",\"b\"]"));
        assert_eq!(reopened.get(THEME_KEY).unwrap().as_deref(), Some("false"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn file_store_rejects_garbage() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("islands.json");
        fs::write(&path, "not json").unwrap();
        let err = FileStore::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Malformed { .. }));
    }
}
