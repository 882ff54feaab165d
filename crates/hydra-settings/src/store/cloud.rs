//! Cross-device cloud key-value store capability
//!
//! Mirrors a platform ubiquitous key-value store: a small string-to-string map
//! replicated between a user's devices in the background. Platforms without
//! one use [`UnavailableCloudStore`], on which every call is a no-op.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Small string key-value store shared between a user's devices.
pub trait CloudKeyValueStore: Send + Sync {
    /// Whether cloud sync is supported and enabled on this device.
    fn is_available(&self) -> bool {
        true
    }

    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    fn all_keys(&self) -> Result<Vec<String>>;
}

/// Cloud store for platforms without cloud key-value support.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCloudStore;

impl CloudKeyValueStore for UnavailableCloudStore {
    fn is_available(&self) -> bool {
        false
    }

    fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn all_keys(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// In-process cloud store that counts traffic, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCloudStore {
    values: Mutex<BTreeMap<String, String>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryCloudStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `set` calls served so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CloudKeyValueStore for MemoryCloudStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let values = self.values.lock().map_err(|error| Error::poisoned(&error))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.values
            .lock()
            .map_err(|error| Error::poisoned(&error))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|error| Error::poisoned(&error))?
            .remove(key);
        Ok(())
    }

    fn all_keys(&self) -> Result<Vec<String>> {
        let values = self.values.lock().map_err(|error| Error::poisoned(&error))?;
        Ok(values.keys().cloned().collect())
    }
}

/// Cloud store persisted as one JSON object on disk.
///
/// Two processes pointed at the same file behave like two devices sharing a
/// cloud account. Every call re-reads the file so external writers are seen.
#[derive(Debug)]
pub struct FileCloudStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCloudStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|error| {
            Error::Cloud(format!(
                "failed to parse cloud store at {}: {error}",
                self.path.display()
            ))
        })
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = self.lock.lock().map_err(|error| Error::poisoned(&error))?;
        let mut values = self.load()?;
        apply(&mut values);
        self.save(&values)
    }
}

impl CloudKeyValueStore for FileCloudStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().map_err(|error| Error::poisoned(&error))?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|values| {
            values.remove(key);
        })
    }

    fn all_keys(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().map_err(|error| Error::poisoned(&error))?;
        Ok(self.load()?.into_keys().collect())
    }
}
