//! In-memory key-value store

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{
    ensure_storable, ChangeHandler, ChangeNotifier, KeyFilter, KeyValueStore, Subscription,
};
use crate::error::{Error, Result};
use crate::models::SettingValue;

/// Process-local store; the reference implementation of [`KeyValueStore`].
#[derive(Default)]
pub struct MemoryKeyStore {
    values: Mutex<BTreeMap<String, SettingValue>>,
    notifier: ChangeNotifier,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every key without firing notifications.
    pub fn clear_silently(&self) -> Result<()> {
        self.values
            .lock()
            .map_err(|error| Error::poisoned(&error))?
            .clear();
        Ok(())
    }
}

impl KeyValueStore for MemoryKeyStore {
    fn get(&self, key: &str) -> Result<Option<SettingValue>> {
        let values = self.values.lock().map_err(|error| Error::poisoned(&error))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: SettingValue) -> Result<()> {
        ensure_storable(key, &value)?;
        self.values
            .lock()
            .map_err(|error| Error::poisoned(&error))?
            .insert(key.to_string(), value);
        self.notifier.notify(key);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|error| Error::poisoned(&error))?
            .remove(key);
        self.notifier.notify(key);
        Ok(())
    }

    fn all_keys(&self) -> Result<Vec<String>> {
        let values = self.values.lock().map_err(|error| Error::poisoned(&error))?;
        Ok(values.keys().cloned().collect())
    }

    fn subscribe(&self, filter: KeyFilter, handler: ChangeHandler) -> Subscription {
        self.notifier.subscribe(filter, handler)
    }
}
