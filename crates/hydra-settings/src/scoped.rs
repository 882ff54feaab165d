//! Scoped settings accessor
//!
//! Reads and writes settings under the active account's namespace. A read
//! that misses the namespaced key falls back to the unscoped legacy key of the
//! same name and, when found, copies it into the namespace once so later reads
//! never consult the legacy key again.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::models::{Scope, SettingValue, SettingValueType, CURRENT_USER_KEY};
use crate::store::SharedStore;

/// Account-scoped view over the live settings store.
#[derive(Clone)]
pub struct ScopedSettings {
    store: SharedStore,
}

impl ScopedSettings {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Scope of the account recorded under the `currentUser` bootstrap key.
    pub fn resolve_scope(&self) -> Result<Scope> {
        let username = self.store.get_string(CURRENT_USER_KEY)?;
        Ok(Scope::from_username(username.as_deref()))
    }

    /// Record (or clear) the active account.
    pub fn set_active_user(&self, username: Option<&str>) -> Result<Scope> {
        match username.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => self.store.set(CURRENT_USER_KEY, SettingValue::from(name))?,
            None => self.store.delete(CURRENT_USER_KEY)?,
        }
        self.resolve_scope()
    }

    fn scope_or_active(&self, scope: Option<&Scope>) -> Result<Scope> {
        match scope {
            Some(scope) => Ok(scope.clone()),
            None => self.resolve_scope(),
        }
    }

    /// Current effective value of a setting, migrating a legacy value if needed.
    pub fn read(&self, setting_key: &str, scope: Option<&Scope>) -> Result<Option<SettingValue>> {
        self.read_matching(setting_key, scope, |_| true)
    }

    pub fn read_bool(&self, setting_key: &str, scope: Option<&Scope>) -> Result<Option<bool>> {
        let value = self.read_typed(setting_key, scope, SettingValueType::Boolean)?;
        Ok(value.and_then(|value| value.as_bool()))
    }

    pub fn read_number(&self, setting_key: &str, scope: Option<&Scope>) -> Result<Option<f64>> {
        let value = self.read_typed(setting_key, scope, SettingValueType::Number)?;
        Ok(value.and_then(|value| value.as_number()))
    }

    pub fn read_string(&self, setting_key: &str, scope: Option<&Scope>) -> Result<Option<String>> {
        let value = self.read_typed(setting_key, scope, SettingValueType::String)?;
        Ok(value.and_then(|value| match value {
            SettingValue::String(text) => Some(text),
            _ => None,
        }))
    }

    /// Read a JSON-encoded structured setting.
    ///
    /// Values that fail to decode as `T` are absent; an undecodable legacy
    /// value is not migrated.
    pub fn read_object<T: DeserializeOwned>(
        &self,
        setting_key: &str,
        scope: Option<&Scope>,
    ) -> Result<Option<T>> {
        let value = self.read_matching(setting_key, scope, |value| {
            value
                .as_str()
                .is_some_and(|raw| serde_json::from_str::<T>(raw).is_ok())
        })?;
        Ok(value
            .and_then(|value| value.as_str().map(str::to_string))
            .and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    /// Write a setting under its namespaced key. The legacy key is never written.
    pub fn write(
        &self,
        setting_key: &str,
        value: impl Into<SettingValue>,
        scope: Option<&Scope>,
    ) -> Result<()> {
        let scope = self.scope_or_active(scope)?;
        self.store.set(&scope.namespaced_key(setting_key), value.into())
    }

    pub fn write_object<T: Serialize>(
        &self,
        setting_key: &str,
        value: &T,
        scope: Option<&Scope>,
    ) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.write(setting_key, SettingValue::String(raw), scope)
    }

    /// Remove the namespaced key only.
    pub fn delete(&self, setting_key: &str, scope: Option<&Scope>) -> Result<()> {
        let scope = self.scope_or_active(scope)?;
        self.store.delete(&scope.namespaced_key(setting_key))
    }

    /// All settings stored under `scope`, keyed by setting key.
    pub fn list(&self, scope: &Scope) -> Result<Vec<(String, SettingValue)>> {
        let mut entries = Vec::new();
        for key in self.store.all_keys()? {
            let Some(setting_key) = scope.setting_key_of(&key) else {
                continue;
            };
            if let Some(value) = self.store.get(&key)? {
                entries.push((setting_key.to_string(), value));
            }
        }
        Ok(entries)
    }

    fn read_typed(
        &self,
        setting_key: &str,
        scope: Option<&Scope>,
        value_type: SettingValueType,
    ) -> Result<Option<SettingValue>> {
        let value = self.read_matching(setting_key, scope, |value| {
            value.value_type() == value_type
        })?;
        Ok(value.filter(|value| value.value_type() == value_type))
    }

    /// Namespaced value if present; otherwise a legacy value accepted by
    /// `accept`, which is then copied into the namespace.
    fn read_matching(
        &self,
        setting_key: &str,
        scope: Option<&Scope>,
        accept: impl Fn(&SettingValue) -> bool,
    ) -> Result<Option<SettingValue>> {
        let scope = self.scope_or_active(scope)?;
        let scoped_key = scope.namespaced_key(setting_key);
        if let Some(value) = self.store.get(&scoped_key)? {
            return Ok(Some(value));
        }

        let Some(legacy) = self.store.get(setting_key)? else {
            return Ok(None);
        };
        if !accept(&legacy) {
            tracing::debug!("Skipping migration of unreadable legacy setting {setting_key}");
            return Ok(None);
        }

        tracing::debug!("Migrating legacy setting {setting_key} into scope {scope}");
        self.store.set(&scoped_key, legacy.clone())?;
        Ok(Some(legacy))
    }
}
