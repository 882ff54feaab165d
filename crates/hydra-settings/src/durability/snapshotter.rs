//! Debounced capture/persist/restore of the durability snapshot

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::SnapshotFile;
use crate::config::SettingsConfig;
use crate::debounce::Debouncer;
use crate::error::Result;
use crate::models::{LocalSnapshot, ScopedKey};
use crate::store::{SharedStore, Subscription};

/// Keeps the durability file in step with the live store.
pub struct SettingsSnapshotter {
    store: SharedStore,
    file: SnapshotFile,
    global_keys: BTreeSet<String>,
    debouncer: Debouncer<()>,
    subscription: Mutex<Option<Subscription>>,
}

impl SettingsSnapshotter {
    /// Must be called from within a tokio runtime.
    pub fn new(store: SharedStore, file: SnapshotFile, config: &SettingsConfig) -> Result<Arc<Self>> {
        Ok(Arc::new(Self {
            store,
            file,
            global_keys: config.global_keys.clone(),
            debouncer: Debouncer::new(config.autosave_debounce())?,
            subscription: Mutex::new(None),
        }))
    }

    pub const fn file(&self) -> &SnapshotFile {
        &self.file
    }

    /// Namespaced settings of any scope, or an allow-listed global key.
    pub fn is_included_key(&self, key: &str) -> bool {
        is_included_key(&self.global_keys, key)
    }

    /// Collect every included key currently in the store.
    pub fn capture_snapshot(&self) -> Result<LocalSnapshot> {
        let mut values = BTreeMap::new();
        for key in self.store.all_keys()? {
            if !self.is_included_key(&key) {
                continue;
            }
            match self.store.get(&key)? {
                Some(value) if value.is_storable() => {
                    values.insert(key, value);
                }
                Some(_) => tracing::warn!("Leaving non-finite {key} out of the snapshot"),
                None => {}
            }
        }
        Ok(LocalSnapshot::new(values))
    }

    /// Overwrite the snapshot file with `snapshot`.
    pub async fn persist(&self, snapshot: &LocalSnapshot) -> Result<()> {
        let payload = snapshot.to_json()?;
        if !self.file.exists().await {
            self.file.create().await?;
        }
        self.file.write(&payload).await
    }

    /// Capture and persist immediately. Failures are logged and skipped.
    pub async fn save_now(&self) -> bool {
        let snapshot = match self.capture_snapshot() {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!("Failed to capture settings snapshot: {error}");
                return false;
            }
        };
        match self.persist(&snapshot).await {
            Ok(()) => {
                tracing::debug!(
                    "Saved {} settings to {}",
                    snapshot.values.len(),
                    self.file.path().display()
                );
                true
            }
            Err(error) => {
                tracing::warn!(
                    "Failed to write settings snapshot to {}: {error}",
                    self.file.path().display()
                );
                false
            }
        }
    }

    /// Replay the snapshot file into the store.
    ///
    /// A missing, unreadable, malformed, or wrong-version file leaves the
    /// store untouched. Returns the number of entries written.
    pub async fn restore(&self) -> usize {
        if !self.file.exists().await {
            return 0;
        }

        let raw = match self.file.read_text().await {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(
                    "Failed to read settings snapshot {}: {error}",
                    self.file.path().display()
                );
                return 0;
            }
        };

        let Some(snapshot) = LocalSnapshot::parse(&raw) else {
            tracing::warn!(
                "Ignoring unreadable settings snapshot {}",
                self.file.path().display()
            );
            return 0;
        };

        let mut restored = 0;
        for (key, value) in snapshot.values {
            if !self.is_included_key(&key) {
                continue;
            }
            match self.store.set(&key, value) {
                Ok(()) => restored += 1,
                Err(error) => tracing::warn!("Failed to restore setting {key}: {error}"),
            }
        }

        tracing::info!(
            "Restored {restored} settings from {}",
            self.file.path().display()
        );
        restored
    }

    /// (Re)arm the autosave timer.
    pub fn schedule_save(self: &Arc<Self>) {
        let this = Arc::downgrade(self);
        self.debouncer.schedule((), async move {
            if let Some(this) = this.upgrade() {
                this.save_now().await;
            }
        });
    }

    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending(&())
    }

    /// Subscribe to store changes and schedule an initial save.
    pub fn start(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let global_keys = self.global_keys.clone();
        let subscription = self.store.subscribe(
            Box::new(move |key| is_included_key(&global_keys, key)),
            Box::new(move |_| {
                if let Some(this) = weak.upgrade() {
                    this.schedule_save();
                }
            }),
        );
        *self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
        self.schedule_save();
    }

    /// Unsubscribe and drop any pending save.
    pub fn stop(&self) {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.debouncer.cancel_all();
    }

    /// Cancel a pending save and perform it now. Returns whether one was pending.
    pub async fn flush(&self) -> bool {
        if self.debouncer.cancel(&()) {
            self.save_now().await;
            true
        } else {
            false
        }
    }
}

fn is_included_key(global_keys: &BTreeSet<String>, key: &str) -> bool {
    ScopedKey::is_namespaced(key) || global_keys.contains(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SettingValue;
    use crate::store::{KeyValueStore, MemoryKeyStore};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, Arc<MemoryKeyStore>, Arc<SettingsSnapshotter>) {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryKeyStore::new());
        let config = SettingsConfig::default();
        let file = SnapshotFile::in_directory(dir.path(), &config.snapshot_file_name);
        let snapshotter = SettingsSnapshotter::new(store.clone(), file, &config).unwrap();
        (dir, store, snapshotter)
    }

    fn seed(store: &MemoryKeyStore) {
        store.set("acctSetting:alice:showUsername", SettingValue::Boolean(false)).unwrap();
        store.set("acctSetting:bob:postTitleLength", SettingValue::Number(90.0)).unwrap();
        store.set("acctSetting:__guest__:theme", SettingValue::from("amoled")).unwrap();
        store.set("allowErrorReporting", SettingValue::Boolean(true)).unwrap();
        store.set("currentUser", SettingValue::from("alice")).unwrap();
        store.set("showUsername", SettingValue::Boolean(true)).unwrap();
    }

    async fn wait_for_saved(snapshotter: &SettingsSnapshotter) -> LocalSnapshot {
        for _ in 0..100 {
            if let Ok(raw) = snapshotter.file().read_text().await {
                if let Some(snapshot) = LocalSnapshot::parse(&raw) {
                    return snapshot;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("snapshot was never written");
    }

    #[tokio::test]
    async fn capture_filters_to_namespace_and_globals() {
        let (_dir, store, snapshotter) = setup();
        seed(&store);

        let snapshot = snapshotter.capture_snapshot().unwrap();
        let keys: Vec<&str> = snapshot.values.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "acctSetting:__guest__:theme",
                "acctSetting:alice:showUsername",
                "acctSetting:bob:postTitleLength",
                "allowErrorReporting",
            ]
        );
    }

    #[tokio::test]
    async fn persist_clear_restore_round_trip() {
        let (_dir, store, snapshotter) = setup();
        seed(&store);
        let before = snapshotter.capture_snapshot().unwrap();
        snapshotter.persist(&before).await.unwrap();

        store.clear_silently().unwrap();
        let restored = snapshotter.restore().await;

        assert_eq!(restored, 4);
        assert_eq!(snapshotter.capture_snapshot().unwrap(), before);
        assert_eq!(store.get("currentUser").unwrap(), None);
        assert_eq!(store.get("showUsername").unwrap(), None);
    }

    #[tokio::test]
    async fn restore_ignores_corrupt_or_foreign_files() {
        let (_dir, store, snapshotter) = setup();
        store.set("acctSetting:alice:blurNSFW", SettingValue::Boolean(true)).unwrap();

        snapshotter.file().create().await.unwrap();
        snapshotter.file().write("{ truncated").await.unwrap();
        assert_eq!(snapshotter.restore().await, 0);

        snapshotter
            .file()
            .write(r#"{"version":7,"values":{"acctSetting:alice:blurNSFW":{"type":"boolean","value":false}}}"#)
            .await
            .unwrap();
        assert_eq!(snapshotter.restore().await, 0);
        assert_eq!(store.get_bool("acctSetting:alice:blurNSFW").unwrap(), Some(true));
    }

    #[tokio::test]
    async fn restore_skips_mistyped_and_excluded_entries() {
        let (_dir, store, snapshotter) = setup();
        snapshotter.file().create().await.unwrap();
        snapshotter
            .file()
            .write(
                r#"{"version":1,"values":{
                    "acctSetting:alice:blurNSFW":{"type":"boolean","value":"nope"},
                    "acctSetting:alice:postTextLength":{"type":"number","value":300},
                    "currentUser":{"type":"string","value":"mallory"}
                }}"#,
            )
            .await
            .unwrap();

        assert_eq!(snapshotter.restore().await, 1);
        assert_eq!(
            store.get("acctSetting:alice:postTextLength").unwrap(),
            Some(SettingValue::Number(300.0))
        );
        assert_eq!(store.get("acctSetting:alice:blurNSFW").unwrap(), None);
        assert_eq!(store.get("currentUser").unwrap(), None);
    }

    #[tokio::test]
    async fn write_failures_are_swallowed_and_not_retried() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("documents");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let store = Arc::new(MemoryKeyStore::new());
        let config = SettingsConfig::default();
        let file = SnapshotFile::in_directory(&blocker, &config.snapshot_file_name);
        let snapshotter = SettingsSnapshotter::new(store.clone(), file, &config).unwrap();
        seed(&store);
        let before = snapshotter.capture_snapshot().unwrap();

        assert!(!snapshotter.save_now().await);

        snapshotter.start();
        store.set("acctSetting:alice:blurNSFW", SettingValue::Boolean(true)).unwrap();
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(!snapshotter.has_pending_save());

        store.set("acctSetting:alice:blurNSFW", SettingValue::Boolean(false)).unwrap();
        assert!(snapshotter.flush().await);
        assert!(!snapshotter.has_pending_save());

        assert!(!snapshotter.file().exists().await);
        assert_eq!(
            std::fs::read_to_string(&blocker).unwrap(),
            "not a directory"
        );
        let mut expected = before.values;
        expected.insert(
            "acctSetting:alice:blurNSFW".to_string(),
            SettingValue::Boolean(false),
        );
        assert_eq!(snapshotter.capture_snapshot().unwrap().values, expected);
        snapshotter.stop();
    }

    #[tokio::test]
    async fn missing_file_restores_nothing() {
        let (_dir, _store, snapshotter) = setup();
        assert_eq!(snapshotter.restore().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn changes_are_saved_after_quiet_period() {
        let (_dir, store, snapshotter) = setup();
        snapshotter.start();

        store.set("acctSetting:alice:voteIndicator", SettingValue::Boolean(true)).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        store.set("acctSetting:alice:voteIndicator", SettingValue::Boolean(false)).unwrap();
        assert!(snapshotter.has_pending_save());

        tokio::time::sleep(Duration::from_millis(600)).await;
        tokio::task::yield_now().await;
        assert!(!snapshotter.has_pending_save());

        let saved = wait_for_saved(&snapshotter).await;
        assert_eq!(
            saved.values.get("acctSetting:alice:voteIndicator"),
            Some(&SettingValue::Boolean(false))
        );
        snapshotter.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_keys_do_not_schedule_saves() {
        let (_dir, store, snapshotter) = setup();
        snapshotter.start();
        snapshotter.flush().await;

        store.set("currentUser", SettingValue::from("alice")).unwrap();
        assert!(!snapshotter.has_pending_save());

        store.set("allowErrorReporting", SettingValue::Boolean(false)).unwrap();
        assert!(snapshotter.has_pending_save());

        snapshotter.stop();
        assert!(!snapshotter.has_pending_save());
        store.set("acctSetting:alice:x", SettingValue::Boolean(true)).unwrap();
        assert!(!snapshotter.has_pending_save());
    }
}
