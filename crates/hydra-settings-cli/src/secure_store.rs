//! Download settings backups persisted in the OS keychain.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

use hydra_settings::store::SecureStore;
use hydra_settings::{Error, Result};
#[cfg(not(test))]
use keyring::Entry;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "hydra-settings";

/// [`SecureStore`] backed by the platform keychain.
#[derive(Debug, Clone, Default)]
pub struct KeyringSecureStore;

impl KeyringSecureStore {
    pub const fn new() -> Self {
        Self
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(key: &str) -> Result<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, key).map_err(|error| Error::SecureStorage(error.to_string()))
    }
}

impl SecureStore for KeyringSecureStore {
    #[cfg(not(test))]
    fn get(&self, key: &str) -> Result<Option<String>> {
        match Self::entry(key)?.get_password() {
            Ok(raw) => Ok(Some(raw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(Error::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| Error::SecureStorage(error.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    #[cfg(not(test))]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        Self::entry(key)?
            .set_password(value)
            .map_err(|error| Error::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| Error::SecureStorage(error.to_string()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    #[cfg(not(test))]
    fn delete(&self, key: &str) -> Result<()> {
        match Self::entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(Error::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn delete(&self, key: &str) -> Result<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| Error::SecureStorage(error.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}
