//! Durable client storage: the browser's local storage, as a trait.
//!
//! The session store is the only writer of the keys below. `MemoryStorage`
//! is the in-process implementation (and what tests use); `FileStorage`
//! keeps the same key/value object as a JSON file so a session survives a
//! restart of the hosting process.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::debug;

use crate::config::ConsoleConfig;

/// Key holding the serialized `Identity`.
pub const USER_KEY: &str = "iot_soc_user";
/// Key holding the opaque bearer token.
pub const TOKEN_KEY: &str = "iot_soc_token";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage file is not a string map: {0}")]
    Format(#[from] serde_json::Error),
}

pub trait ClientStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: ClientStorage + ?Sized> ClientStorage for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> { (**self).get(key) }
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> { (**self).set(key, value) }
    fn remove(&self, key: &str) -> Result<(), StorageError> { (**self).remove(key) }
}

/// Shared in-memory map. Clones see the same entries, which is how a test
/// "reloads the page": build a second store over a clone of the first's storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }

    pub fn contains(&self, key: &str) -> bool { self.entries.read().contains_key(key) }

    pub fn len(&self) -> usize { self.entries.read().len() }

    pub fn is_empty(&self) -> bool { self.entries.read().is_empty() }
}

impl ClientStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> { Ok(self.entries.read().get(key).cloned()) }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Key/value object persisted as a single JSON file.
/// Every write rewrites the file through a sibling temp file and a rename.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self { Self { path: path.as_ref().to_path_buf(), lock: Mutex::new(()) } }

    pub fn path(&self) -> &Path { &self.path }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(|b| b.is_ascii_whitespace()) => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() { std::fs::create_dir_all(dir)?; }
        }
        let tmp = self.path.with_extension("tmp");
        {
            let mut f = std::fs::File::create(&tmp)?;
            f.write_all(&serde_json::to_vec_pretty(map)?)?;
            f.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ClientStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _g = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _g = self.lock.lock();
        // an unreadable file is replaced rather than blocking every future write
        let mut map = self.load().unwrap_or_default();
        map.insert(key.to_string(), value.to_string());
        self.store(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _g = self.lock.lock();
        let mut map = match self.load() {
            Ok(m) => m,
            Err(_) => BTreeMap::new(),
        };
        if map.remove(key).is_none() && !self.path.exists() {
            return Ok(());
        }
        self.store(&map)
    }
}

/// Storage selected by `config.storage_path`: a `FileStorage` there, or a
/// fresh `MemoryStorage` when unset.
pub fn open_configured(config: &ConsoleConfig) -> Arc<dyn ClientStorage> {
    match &config.storage_path {
        Some(path) => {
            debug!(target: "iotsoc::session", "session storage at {}", path.display());
            Arc::new(FileStorage::new(path))
        }
        None => Arc::new(MemoryStorage::new()),
    }
}
