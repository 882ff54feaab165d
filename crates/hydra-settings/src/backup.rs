//! Download preference backup in the secure store
//!
//! Download preferences are mirrored per scope into the secure store, which
//! survives app-data resets that wipe the settings store. On the next launch
//! any missing preference is restored from the backup.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::downloads::{
    DOWNLOAD_DESTINATION_KEY, DOWNLOAD_FILES_ROOT_URI_KEY, DOWNLOAD_LONG_PRESS_ACTION_KEY,
};
use crate::models::{DownloadDestination, MediaLongPressAction, Scope};
use crate::scoped::ScopedSettings;
use crate::store::SecureStore;
use crate::util::normalize_text_option;

pub const DOWNLOAD_SETTINGS_BACKUP_KEY_PREFIX: &str = "downloadSettingsBackup";

pub fn backup_key(scope: &Scope) -> String {
    format!("{DOWNLOAD_SETTINGS_BACKUP_KEY_PREFIX}:{scope}")
}

/// Backed-up download preferences. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadSettingsBackup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_press_action: Option<MediaLongPressAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_destination: Option<DownloadDestination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_root_uri: Option<String>,
}

impl DownloadSettingsBackup {
    pub const fn is_empty(&self) -> bool {
        self.long_press_action.is_none()
            && self.download_destination.is_none()
            && self.files_root_uri.is_none()
    }

    fn normalized(mut self) -> Self {
        self.files_root_uri = normalize_text_option(self.files_root_uri);
        self
    }

    /// Parse a stored record field by field; unknown values drop to `None`.
    fn parse_lenient(raw: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        let object = value.as_object()?;
        let text = |name: &str| object.get(name).and_then(serde_json::Value::as_str);
        Some(Self {
            long_press_action: text("longPressAction").and_then(MediaLongPressAction::parse),
            download_destination: text("downloadDestination").and_then(DownloadDestination::parse),
            files_root_uri: text("filesRootUri").map(str::to_string),
        })
    }
}

/// Effective download preferences after restoring and applying defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDownloadSettings {
    pub long_press_action: MediaLongPressAction,
    pub download_destination: DownloadDestination,
    pub files_root_uri: Option<String>,
}

impl From<&ResolvedDownloadSettings> for DownloadSettingsBackup {
    fn from(resolved: &ResolvedDownloadSettings) -> Self {
        Self {
            long_press_action: Some(resolved.long_press_action),
            download_destination: Some(resolved.download_destination),
            files_root_uri: resolved.files_root_uri.clone(),
        }
    }
}

pub struct DownloadSettingsBackupStore {
    secure: Arc<dyn SecureStore>,
}

impl DownloadSettingsBackupStore {
    pub fn new(secure: Arc<dyn SecureStore>) -> Self {
        Self { secure }
    }

    /// Backup for `scope`; a malformed record reads as absent.
    pub fn get(&self, scope: &Scope) -> Result<Option<DownloadSettingsBackup>> {
        let Some(raw) = self.secure.get(&backup_key(scope))? else {
            return Ok(None);
        };
        let backup = DownloadSettingsBackup::parse_lenient(&raw);
        if backup.is_none() {
            tracing::warn!("Ignoring malformed download settings backup for scope {scope}");
        }
        Ok(backup)
    }

    /// Store the normalized backup, or delete it when nothing is left.
    pub fn set(&self, scope: &Scope, backup: DownloadSettingsBackup) -> Result<()> {
        let backup = backup.normalized();
        let key = backup_key(scope);
        if backup.is_empty() {
            return self.secure.delete(&key);
        }
        self.secure.set(&key, &serde_json::to_string(&backup)?)
    }

    /// Fill missing download preferences for `scope` from the backup.
    ///
    /// Restored values are written back through `settings`; defaults fill
    /// whatever neither source has, and the resolved result is backed up again.
    pub fn restore_if_needed(
        &self,
        settings: &ScopedSettings,
        scope: &Scope,
    ) -> Result<ResolvedDownloadSettings> {
        let mut long_press_action = settings
            .read_string(DOWNLOAD_LONG_PRESS_ACTION_KEY, Some(scope))?
            .as_deref()
            .and_then(MediaLongPressAction::parse);
        let mut download_destination = settings
            .read_string(DOWNLOAD_DESTINATION_KEY, Some(scope))?
            .as_deref()
            .and_then(DownloadDestination::parse);
        let mut files_root_uri =
            normalize_text_option(settings.read_string(DOWNLOAD_FILES_ROOT_URI_KEY, Some(scope))?);

        let needs_backup = long_press_action.is_none()
            || download_destination.is_none()
            || (download_destination.unwrap_or_default() == DownloadDestination::Files
                && files_root_uri.is_none());

        if needs_backup {
            let backup = self.get(scope).unwrap_or_else(|error| {
                tracing::warn!("Failed to read download settings backup for scope {scope}: {error}");
                None
            });
            if let Some(backup) = backup {
                if long_press_action.is_none() {
                    if let Some(action) = backup.long_press_action {
                        settings.write(DOWNLOAD_LONG_PRESS_ACTION_KEY, action.as_str(), Some(scope))?;
                        long_press_action = Some(action);
                    }
                }
                if download_destination.is_none() {
                    if let Some(destination) = backup.download_destination {
                        settings.write(DOWNLOAD_DESTINATION_KEY, destination.as_str(), Some(scope))?;
                        download_destination = Some(destination);
                    }
                }
                if files_root_uri.is_none() {
                    if let Some(uri) = normalize_text_option(backup.files_root_uri) {
                        settings.write(DOWNLOAD_FILES_ROOT_URI_KEY, uri.as_str(), Some(scope))?;
                        files_root_uri = Some(uri);
                    }
                }
                tracing::debug!("Restored download settings for scope {scope} from backup");
            }
        }

        let resolved = ResolvedDownloadSettings {
            long_press_action: long_press_action.unwrap_or_default(),
            download_destination: download_destination.unwrap_or_default(),
            files_root_uri,
        };
        if let Err(error) = self.set(scope, DownloadSettingsBackup::from(&resolved)) {
            tracing::warn!("Failed to save download settings backup for scope {scope}: {error}");
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SettingValue;
    use crate::store::{KeyValueStore, MemoryKeyStore, MemorySecureStore};
    use pretty_assertions::assert_eq;

    fn setup() -> (
        Arc<MemoryKeyStore>,
        Arc<MemorySecureStore>,
        ScopedSettings,
        DownloadSettingsBackupStore,
    ) {
        let store = Arc::new(MemoryKeyStore::new());
        let secure = Arc::new(MemorySecureStore::new());
        let settings = ScopedSettings::new(store.clone());
        let backups = DownloadSettingsBackupStore::new(secure.clone());
        (store, secure, settings, backups)
    }

    fn alice() -> Scope {
        Scope::from_username(Some("alice"))
    }

    #[test]
    fn set_normalizes_and_deletes_when_empty() {
        let (_store, secure, _settings, backups) = setup();
        backups
            .set(
                &alice(),
                DownloadSettingsBackup {
                    long_press_action: Some(MediaLongPressAction::Download),
                    download_destination: None,
                    files_root_uri: Some("  file:///Downloads  ".to_string()),
                },
            )
            .unwrap();
        assert_eq!(
            secure.get("downloadSettingsBackup:alice").unwrap().as_deref(),
            Some(r#"{"longPressAction":"download","filesRootUri":"file:///Downloads"}"#)
        );

        backups
            .set(
                &alice(),
                DownloadSettingsBackup {
                    files_root_uri: Some("   ".to_string()),
                    ..DownloadSettingsBackup::default()
                },
            )
            .unwrap();
        assert_eq!(secure.get("downloadSettingsBackup:alice").unwrap(), None);
    }

    #[test]
    fn get_tolerates_bad_records() {
        let (_store, secure, _settings, backups) = setup();
        secure.set("downloadSettingsBackup:alice", "not json").unwrap();
        assert_eq!(backups.get(&alice()).unwrap(), None);

        secure
            .set(
                "downloadSettingsBackup:alice",
                r#"{"longPressAction":"explode","downloadDestination":"files","filesRootUri":7}"#,
            )
            .unwrap();
        assert_eq!(
            backups.get(&alice()).unwrap(),
            Some(DownloadSettingsBackup {
                long_press_action: None,
                download_destination: Some(DownloadDestination::Files),
                files_root_uri: None,
            })
        );
    }

    #[test]
    fn restore_fills_missing_settings_from_backup() {
        let (store, _secure, settings, backups) = setup();
        backups
            .set(
                &alice(),
                DownloadSettingsBackup {
                    long_press_action: Some(MediaLongPressAction::Download),
                    download_destination: Some(DownloadDestination::Files),
                    files_root_uri: Some("file:///Media".to_string()),
                },
            )
            .unwrap();

        let resolved = backups.restore_if_needed(&settings, &alice()).unwrap();

        assert_eq!(
            resolved,
            ResolvedDownloadSettings {
                long_press_action: MediaLongPressAction::Download,
                download_destination: DownloadDestination::Files,
                files_root_uri: Some("file:///Media".to_string()),
            }
        );
        assert_eq!(
            store.get("acctSetting:alice:downloadDestination").unwrap(),
            Some(SettingValue::from("files"))
        );
        assert_eq!(
            store.get_string("acctSetting:alice:downloadFilesRootUri").unwrap().as_deref(),
            Some("file:///Media")
        );
    }

    #[test]
    fn stored_settings_win_over_backup() {
        let (store, _secure, settings, backups) = setup();
        settings
            .write(DOWNLOAD_LONG_PRESS_ACTION_KEY, "share", Some(&alice()))
            .unwrap();
        settings
            .write(DOWNLOAD_DESTINATION_KEY, "photos", Some(&alice()))
            .unwrap();
        backups
            .set(
                &alice(),
                DownloadSettingsBackup {
                    long_press_action: Some(MediaLongPressAction::Download),
                    download_destination: Some(DownloadDestination::Files),
                    files_root_uri: Some("file:///Media".to_string()),
                },
            )
            .unwrap();

        let resolved = backups.restore_if_needed(&settings, &alice()).unwrap();

        assert_eq!(resolved.long_press_action, MediaLongPressAction::Share);
        assert_eq!(resolved.download_destination, DownloadDestination::Photos);
        assert_eq!(resolved.files_root_uri, None);
        assert!(!store.contains_key("acctSetting:alice:downloadFilesRootUri").unwrap());
        assert_eq!(
            backups.get(&alice()).unwrap(),
            Some(DownloadSettingsBackup {
                long_press_action: Some(MediaLongPressAction::Share),
                download_destination: Some(DownloadDestination::Photos),
                files_root_uri: None,
            })
        );
    }

    #[test]
    fn no_backup_resolves_defaults_and_records_them() {
        let (store, _secure, settings, backups) = setup();

        let resolved = backups.restore_if_needed(&settings, &alice()).unwrap();

        assert_eq!(resolved.long_press_action, MediaLongPressAction::Share);
        assert_eq!(resolved.download_destination, DownloadDestination::Photos);
        assert!(store.all_keys().unwrap().is_empty());
        assert!(backups.get(&alice()).unwrap().is_some());
    }
}
