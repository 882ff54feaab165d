//! Settings engine configuration.
//!
//! All fields have defaults matching the shipping app, so an absent config
//! file is equivalent to `SettingsConfig::default()`.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::downloads::DOWNLOAD_FILES_ROOT_URI_KEY;
use crate::util::normalize_text_option;

const DEFAULT_SNAPSHOT_FILE_NAME: &str = "hydra-settings-snapshot-v1.json";
const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 500;
const DEFAULT_CLOUD_PUSH_DEBOUNCE_MS: u64 = 1_500;

/// Tunables for the durability snapshotter and the cloud mirror.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsConfig {
    /// File name of the durability snapshot inside the app document directory
    pub snapshot_file_name: String,
    /// Quiet period before a changed setting is written to the snapshot file
    pub autosave_debounce_ms: u64,
    /// Quiet period before a scope's changes are pushed to the cloud store
    pub cloud_push_debounce_ms: u64,
    /// Unscoped keys included in the durability snapshot
    pub global_keys: BTreeSet<String>,
    /// Setting keys that are device-local and never synced
    pub cloud_excluded_keys: BTreeSet<String>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            snapshot_file_name: DEFAULT_SNAPSHOT_FILE_NAME.to_string(),
            autosave_debounce_ms: DEFAULT_AUTOSAVE_DEBOUNCE_MS,
            cloud_push_debounce_ms: DEFAULT_CLOUD_PUSH_DEBOUNCE_MS,
            global_keys: BTreeSet::from(["allowErrorReporting".to_string()]),
            cloud_excluded_keys: BTreeSet::from([DOWNLOAD_FILES_ROOT_URI_KEY.to_string()]),
        }
    }
}

impl SettingsConfig {
    /// Load config from a JSON file, falling back to defaults when absent.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            Error::Config(format!("Failed to read config at {}: {error}", path.display()))
        })?;
        Self::parse(&raw).map_err(|error| {
            Error::Config(format!("Failed to parse config at {}: {error}", path.display()))
        })
    }

    /// Parse and normalize a JSON config document.
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        let mut config = serde_json::from_str::<Self>(raw).map_err(|error| error.to_string())?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Trim key lists and drop empty entries.
    pub fn normalize(&mut self) {
        self.global_keys = normalize_keys(&self.global_keys);
        self.cloud_excluded_keys = normalize_keys(&self.cloud_excluded_keys);
        self.snapshot_file_name = self.snapshot_file_name.trim().to_string();
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.snapshot_file_name.is_empty() {
            return Err("snapshot_file_name must not be empty".to_string());
        }
        if self.snapshot_file_name.contains(['/', '\\']) {
            return Err("snapshot_file_name must be a file name, not a path".to_string());
        }
        Ok(())
    }

    pub const fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub const fn cloud_push_debounce(&self) -> Duration {
        Duration::from_millis(self.cloud_push_debounce_ms)
    }

    pub fn is_global_key(&self, key: &str) -> bool {
        self.global_keys.contains(key)
    }

    pub fn is_cloud_excluded(&self, setting_key: &str) -> bool {
        self.cloud_excluded_keys.contains(setting_key)
    }
}

fn normalize_keys(keys: &BTreeSet<String>) -> BTreeSet<String> {
    keys.iter()
        .filter_map(|key| normalize_text_option(Some(key.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_shipping_values() {
        let config = SettingsConfig::default();
        assert_eq!(config.autosave_debounce(), Duration::from_millis(500));
        assert_eq!(config.cloud_push_debounce(), Duration::from_millis(1_500));
        assert!(config.is_global_key("allowErrorReporting"));
        assert!(config.is_cloud_excluded("downloadFilesRootUri"));
    }

    #[test]
    fn parse_fills_missing_fields_and_trims_keys() {
        let config = SettingsConfig::parse(
            r#"{ "cloud_push_debounce_ms": 250, "global_keys": [" themeOverride ", ""] }"#,
        )
        .unwrap();
        assert_eq!(config.cloud_push_debounce_ms, 250);
        assert_eq!(config.autosave_debounce_ms, 500);
        assert_eq!(
            config.global_keys,
            BTreeSet::from(["themeOverride".to_string()])
        );
    }

    #[test]
    fn parse_rejects_unknown_fields_and_paths() {
        let error = SettingsConfig::parse(r#"{ "unexpected": true }"#).unwrap_err();
        assert!(error.contains("unknown field"));

        let error = SettingsConfig::parse(r#"{ "snapshot_file_name": "../x.json" }"#).unwrap_err();
        assert!(error.contains("file name"));
    }

    #[test]
    fn load_from_missing_path_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = SettingsConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, SettingsConfig::default());
    }

    #[test]
    fn load_from_malformed_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings-config.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            SettingsConfig::load_from_path(&path),
            Err(Error::Config(_))
        ));
    }
}
