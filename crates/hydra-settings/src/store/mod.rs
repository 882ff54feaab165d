//! Storage capabilities the settings engine runs on
//!
//! - [`KeyValueStore`]: the live settings store (synchronous, typed values,
//!   change notifications)
//! - [`CloudKeyValueStore`]: small cross-device string store
//! - [`SecureStore`]: keychain-style string store for backups

pub mod cloud;
mod memory;
mod migrations;
pub mod secure;
mod sqlite;

use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::error::{Error, Result};
use crate::models::SettingValue;

pub use cloud::{CloudKeyValueStore, FileCloudStore, MemoryCloudStore, UnavailableCloudStore};
pub use memory::MemoryKeyStore;
pub use secure::{MemorySecureStore, SecureStore};
pub use sqlite::SqliteKeyStore;

/// Decides whether a listener cares about a changed key.
pub type KeyFilter = Box<dyn Fn(&str) -> bool + Send + Sync>;
/// Invoked with the changed key after a mutation is committed.
pub type ChangeHandler = Box<dyn Fn(&str) + Send + Sync>;

/// Synchronous key-value store holding string, number, or boolean values.
///
/// Every `set`/`delete` fires the store's change notification with the
/// affected key once the write is visible to readers.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<SettingValue>>;

    fn set(&self, key: &str, value: SettingValue) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;

    fn all_keys(&self) -> Result<Vec<String>>;

    /// Register a change listener; dropping the returned [`Subscription`]
    /// removes it.
    fn subscribe(&self, filter: KeyFilter, handler: ChangeHandler) -> Subscription;

    fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(match self.get(key)? {
            Some(SettingValue::String(value)) => Some(value),
            _ => None,
        })
    }

    fn get_number(&self, key: &str) -> Result<Option<f64>> {
        Ok(self.get(key)?.and_then(|value| value.as_number()))
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.get(key)?.and_then(|value| value.as_bool()))
    }
}

/// Refuse values with no faithful serialized form.
pub fn ensure_storable(key: &str, value: &SettingValue) -> Result<()> {
    if value.is_storable() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{key}: numbers must be finite, got {value}"
        )))
    }
}

/// Shared handle to the live settings store.
pub type SharedStore = Arc<dyn KeyValueStore>;

struct Listener {
    id: u64,
    filter: KeyFilter,
    handler: ChangeHandler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<Arc<Listener>>,
}

/// Listener registry embedded by store implementations.
#[derive(Default)]
pub struct ChangeNotifier {
    registry: Arc<Mutex<Registry>>,
}

impl ChangeNotifier {
    pub fn subscribe(&self, filter: KeyFilter, handler: ChangeHandler) -> Subscription {
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push(Arc::new(Listener {
            id,
            filter,
            handler,
        }));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Dispatch `key` to matching listeners.
    ///
    /// The registry lock is released before handlers run, so handlers may
    /// write to the store (and be notified again) or unsubscribe.
    pub fn notify(&self, key: &str) {
        let listeners = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .clone();
        for listener in listeners {
            if (listener.filter)(key) {
                (listener.handler)(key);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }
}

/// Registration handle returned by [`KeyValueStore::subscribe`].
#[must_use = "dropping a Subscription removes the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .listeners
                .retain(|listener| listener.id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("id", &self.id)
            .finish()
    }
}
