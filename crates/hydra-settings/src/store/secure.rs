//! Keychain-style secure string storage

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Small secret/string store that survives app-data resets (e.g. a keychain).
pub trait SecureStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// In-process secure store for tests and platforms without a keychain.
#[derive(Debug, Default)]
pub struct MemorySecureStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for MemorySecureStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|error| Error::SecureStorage(error.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|error| Error::SecureStorage(error.to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|error| Error::SecureStorage(error.to_string()))?
            .remove(key);
        Ok(())
    }
}
