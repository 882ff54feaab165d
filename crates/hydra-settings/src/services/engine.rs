//! Settings engine wiring the accessor, durability snapshot and cloud sync.

use std::path::PathBuf;
use std::sync::Arc;

use crate::backup::{DownloadSettingsBackupStore, ResolvedDownloadSettings};
use crate::config::SettingsConfig;
use crate::durability::{SettingsSnapshotter, SnapshotFile};
use crate::error::Result;
use crate::models::Scope;
use crate::scoped::ScopedSettings;
use crate::store::{
    CloudKeyValueStore, FileCloudStore, SecureStore, SharedStore, SqliteKeyStore,
    UnavailableCloudStore,
};
use crate::sync::{CloudMirrorSync, SyncOutcome};

/// Filesystem locations for a desktop engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnginePaths {
    /// `SQLite` settings store
    pub store: PathBuf,
    /// Shared cloud document; `None` disables cloud sync
    pub cloud: Option<PathBuf>,
    /// Durability snapshot file
    pub snapshot: PathBuf,
}

/// What happened during [`SettingsEngine::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartReport {
    pub restored: usize,
    pub sync: SyncOutcome,
}

/// What happened during [`SettingsEngine::flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    pub snapshot_saved: bool,
    pub scopes_pushed: usize,
}

/// One per process: owns the three settings components and their lifecycle.
pub struct SettingsEngine {
    config: SettingsConfig,
    settings: ScopedSettings,
    snapshotter: Arc<SettingsSnapshotter>,
    sync: Arc<CloudMirrorSync>,
    backups: DownloadSettingsBackupStore,
}

impl SettingsEngine {
    /// Must be called from within a tokio runtime.
    pub fn new(
        store: SharedStore,
        cloud: Arc<dyn CloudKeyValueStore>,
        secure: Arc<dyn SecureStore>,
        snapshot: SnapshotFile,
        config: SettingsConfig,
    ) -> Result<Self> {
        let snapshotter = SettingsSnapshotter::new(store.clone(), snapshot, &config)?;
        let sync = CloudMirrorSync::new(store.clone(), cloud, &config)?;
        Ok(Self {
            config,
            settings: ScopedSettings::new(store),
            snapshotter,
            sync,
            backups: DownloadSettingsBackupStore::new(secure),
        })
    }

    /// Open an engine over a `SQLite` store and an optional file-backed cloud.
    pub fn open(
        paths: &EnginePaths,
        secure: Arc<dyn SecureStore>,
        config: SettingsConfig,
    ) -> Result<Self> {
        let store: SharedStore = Arc::new(SqliteKeyStore::open(&paths.store)?);
        let cloud: Arc<dyn CloudKeyValueStore> = match &paths.cloud {
            Some(path) => Arc::new(FileCloudStore::new(path)),
            None => {
                tracing::info!("Running in local-only mode (no cloud store)");
                Arc::new(UnavailableCloudStore)
            }
        };
        Self::new(store, cloud, secure, SnapshotFile::new(&paths.snapshot), config)
    }

    pub const fn config(&self) -> &SettingsConfig {
        &self.config
    }

    pub const fn settings(&self) -> &ScopedSettings {
        &self.settings
    }

    pub fn store(&self) -> &SharedStore {
        self.settings.store()
    }

    pub fn snapshotter(&self) -> &Arc<SettingsSnapshotter> {
        &self.snapshotter
    }

    pub fn sync(&self) -> &Arc<CloudMirrorSync> {
        &self.sync
    }

    pub const fn backups(&self) -> &DownloadSettingsBackupStore {
        &self.backups
    }

    pub fn active_scope(&self) -> Result<Scope> {
        self.settings.resolve_scope()
    }

    /// Restore the durability snapshot, start both listeners, then reconcile
    /// the active account.
    ///
    /// Restoring happens before the listeners subscribe so restored values
    /// are neither re-saved nor stamped as local edits.
    pub async fn start(&self) -> StartReport {
        let restored = self.snapshotter.restore().await;
        self.snapshotter.start();
        self.sync.start();
        let sync = self.sync.sync_current_user();
        tracing::info!("Settings engine started (restored {restored}, sync {sync})");
        StartReport { restored, sync }
    }

    pub fn stop(&self) {
        self.snapshotter.stop();
        self.sync.stop();
        tracing::debug!("Settings engine stopped");
    }

    /// Run pending debounced saves and pushes now.
    pub async fn flush(&self) -> FlushReport {
        let scopes_pushed = self.sync.flush();
        let snapshot_saved = self.snapshotter.flush().await;
        FlushReport {
            snapshot_saved,
            scopes_pushed,
        }
    }

    /// Switch the active account and reconcile its scope.
    pub fn activate_account(&self, username: Option<&str>) -> Result<SyncOutcome> {
        let scope = self.settings.set_active_user(username)?;
        tracing::info!("Active settings scope is now {scope}");
        Ok(self.sync.reconcile(&scope))
    }

    pub fn sync_current_user(&self) -> SyncOutcome {
        self.sync.sync_current_user()
    }

    /// Restore missing download preferences for the active account.
    pub fn restore_download_settings(&self) -> Result<ResolvedDownloadSettings> {
        let scope = self.active_scope()?;
        self.backups.restore_if_needed(&self.settings, &scope)
    }
}

impl Drop for SettingsEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
