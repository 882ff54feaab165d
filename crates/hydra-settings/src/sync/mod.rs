//! Cloud mirror synchronization
//!
//! Each account scope is mirrored as a single [`ScopeSnapshot`] record in the
//! cloud key-value store. Reconciliation is last-writer-wins on the snapshot's
//! `updatedAt`, compared against a timestamp tracked locally per scope. Local
//! edits stamp a fresh timestamp and schedule a debounced push; writes made
//! while applying a remote snapshot are not echoed back.

mod guard;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use guard::{GuardKind, ScopeGuards};

use crate::config::SettingsConfig;
use crate::debounce::Debouncer;
use crate::error::{Error, Result};
use crate::models::{Scope, ScopeSnapshot, ScopedKey, SettingValue, CURRENT_USER_KEY};
use crate::store::{CloudKeyValueStore, SharedStore, Subscription};
use crate::util::{next_timestamp, unix_millis_now};

/// Prefix of the cloud record holding one scope's snapshot.
pub const CLOUD_RECORD_KEY_PREFIX: &str = "hydra:settings:";

/// Prefix of the local key tracking a scope's last known `updatedAt`.
pub const UPDATED_AT_KEY_PREFIX: &str = "iCloudSyncUpdatedAt:";

pub fn cloud_record_key(scope: &Scope) -> String {
    format!("{CLOUD_RECORD_KEY_PREFIX}{scope}")
}

pub fn updated_at_key(scope: &Scope) -> String {
    format!("{UPDATED_AT_KEY_PREFIX}{scope}")
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Guest scope, or no cloud store on this device.
    Ineligible,
    /// A reconciliation for the scope was already running.
    AlreadyRunning,
    /// No usable remote record existed; the local snapshot was published.
    PushedInitial,
    /// The remote snapshot was newer and replaced local state.
    AppliedRemote,
    /// Local state was newer and was published.
    PushedLocal,
    UpToDate,
    /// Cloud or store I/O failed; nothing further was attempted.
    Failed,
}

impl SyncOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ineligible => "ineligible",
            Self::AlreadyRunning => "already-running",
            Self::PushedInitial => "pushed-initial",
            Self::AppliedRemote => "applied-remote",
            Self::PushedLocal => "pushed-local",
            Self::UpToDate => "up-to-date",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mirrors account scopes into the cloud key-value store.
pub struct CloudMirrorSync {
    store: SharedStore,
    cloud: Arc<dyn CloudKeyValueStore>,
    excluded_keys: BTreeSet<String>,
    guards: ScopeGuards,
    debouncer: Debouncer<Scope>,
    subscription: Mutex<Option<Subscription>>,
}

impl CloudMirrorSync {
    /// Must be called from within a tokio runtime.
    pub fn new(
        store: SharedStore,
        cloud: Arc<dyn CloudKeyValueStore>,
        config: &SettingsConfig,
    ) -> Result<Arc<Self>> {
        Ok(Arc::new(Self {
            store,
            cloud,
            excluded_keys: config.cloud_excluded_keys.clone(),
            guards: ScopeGuards::default(),
            debouncer: Debouncer::new(config.cloud_push_debounce())?,
            subscription: Mutex::new(None),
        }))
    }

    pub fn is_available(&self) -> bool {
        self.cloud.is_available()
    }

    /// Whether `scope` takes part in cloud sync on this device.
    pub fn is_eligible(&self, scope: &Scope) -> bool {
        !scope.is_guest() && self.cloud.is_available()
    }

    pub fn is_excluded_key(&self, setting_key: &str) -> bool {
        self.excluded_keys.contains(setting_key)
    }

    /// Locally tracked `updatedAt` for `scope`, or 0 when none is tracked.
    pub fn local_updated_at(&self, scope: &Scope) -> Result<i64> {
        let value = self.store.get_number(&updated_at_key(scope))?;
        #[allow(clippy::cast_possible_truncation)]
        let updated_at = value
            .filter(|millis| millis.is_finite())
            .map_or(0, |millis| millis as i64);
        Ok(updated_at)
    }

    pub fn set_local_updated_at(&self, scope: &Scope, updated_at: i64) -> Result<()> {
        #[allow(clippy::cast_precision_loss)]
        let value = SettingValue::Number(updated_at as f64);
        self.store.set(&updated_at_key(scope), value)
    }

    /// Every syncable setting stored under `scope`, keyed by setting key.
    pub fn collect_scope(&self, scope: &Scope) -> Result<BTreeMap<String, SettingValue>> {
        let mut values = BTreeMap::new();
        for key in self.store.all_keys()? {
            let Some(setting_key) = scope.setting_key_of(&key) else {
                continue;
            };
            if self.is_excluded_key(setting_key) {
                continue;
            }
            match self.store.get(&key)? {
                Some(value) if value.is_storable() => {
                    values.insert(setting_key.to_string(), value);
                }
                Some(_) => tracing::warn!("Not syncing non-finite {key}"),
                None => {}
            }
        }
        Ok(values)
    }

    /// Remote snapshot for `scope`. A malformed record reads as absent, and
    /// so does every record of a scope that is not eligible.
    pub fn read_remote(&self, scope: &Scope) -> Result<Option<ScopeSnapshot>> {
        if !self.is_eligible(scope) {
            return Ok(None);
        }
        let Some(raw) = self.cloud.get(&cloud_record_key(scope))? else {
            return Ok(None);
        };
        let snapshot = ScopeSnapshot::parse(&raw);
        if snapshot.is_none() {
            tracing::warn!("Ignoring malformed cloud settings record for scope {scope}");
        }
        Ok(snapshot)
    }

    /// Publish the scope's current settings under its current `updatedAt`.
    ///
    /// Assigns `updatedAt = now` when the scope has never been stamped.
    pub fn push_scope(&self, scope: &Scope) -> Result<ScopeSnapshot> {
        if !self.is_eligible(scope) {
            return Err(Error::InvalidInput(format!(
                "scope {scope} is not eligible for cloud sync"
            )));
        }

        let mut updated_at = self.local_updated_at(scope)?;
        if updated_at <= 0 {
            updated_at = unix_millis_now();
            self.set_local_updated_at(scope, updated_at)?;
        }

        let snapshot = ScopeSnapshot {
            updated_at,
            values: self.collect_scope(scope)?,
        };
        self.cloud.set(&cloud_record_key(scope), &snapshot.to_json()?)?;
        tracing::info!(
            "Pushed {} settings for scope {scope} (updatedAt {updated_at})",
            snapshot.values.len()
        );
        Ok(snapshot)
    }

    /// Replace the scope's local settings with `remote`.
    ///
    /// Store notifications raised here are not treated as local edits.
    pub fn apply_remote(&self, scope: &Scope, remote: &ScopeSnapshot) -> Result<()> {
        let Some(_applying) = self.guards.try_enter(scope, GuardKind::Apply) else {
            tracing::debug!("Remote apply already running for scope {scope}");
            return Ok(());
        };

        for key in self.store.all_keys()? {
            let Some(setting_key) = scope.setting_key_of(&key) else {
                continue;
            };
            if self.is_excluded_key(setting_key) || remote.values.contains_key(setting_key) {
                continue;
            }
            self.store.delete(&key)?;
        }

        for (setting_key, value) in &remote.values {
            if self.is_excluded_key(setting_key) {
                continue;
            }
            self.store
                .set(&scope.namespaced_key(setting_key), value.clone())?;
        }

        self.set_local_updated_at(scope, remote.updated_at)?;
        tracing::info!(
            "Applied {} cloud settings to scope {scope} (updatedAt {})",
            remote.values.len(),
            remote.updated_at
        );
        Ok(())
    }

    /// Reconcile `scope` with its cloud record, last writer wins.
    pub fn reconcile(&self, scope: &Scope) -> SyncOutcome {
        if !self.is_eligible(scope) {
            tracing::debug!("Skipping cloud sync for scope {scope}");
            return SyncOutcome::Ineligible;
        }
        let Some(_syncing) = self.guards.try_enter(scope, GuardKind::Sync) else {
            tracing::debug!("Cloud sync already running for scope {scope}");
            return SyncOutcome::AlreadyRunning;
        };

        match self.reconcile_guarded(scope) {
            Ok(outcome) => {
                tracing::debug!("Cloud sync for scope {scope}: {outcome}");
                outcome
            }
            Err(error) => {
                tracing::warn!("Cloud sync failed for scope {scope}: {error}");
                SyncOutcome::Failed
            }
        }
    }

    fn reconcile_guarded(&self, scope: &Scope) -> Result<SyncOutcome> {
        let Some(remote) = self.read_remote(scope)? else {
            self.push_scope(scope)?;
            return Ok(SyncOutcome::PushedInitial);
        };

        let local = self.local_updated_at(scope)?;
        match remote.updated_at.cmp(&local) {
            Ordering::Greater => {
                self.apply_remote(scope, &remote)?;
                Ok(SyncOutcome::AppliedRemote)
            }
            Ordering::Less => {
                self.push_scope(scope)?;
                Ok(SyncOutcome::PushedLocal)
            }
            Ordering::Equal => Ok(SyncOutcome::UpToDate),
        }
    }

    pub fn sync_for_user(&self, username: Option<&str>) -> SyncOutcome {
        self.reconcile(&Scope::from_username(username))
    }

    /// Reconcile the scope of the account recorded under `currentUser`.
    pub fn sync_current_user(&self) -> SyncOutcome {
        match self.store.get_string(CURRENT_USER_KEY) {
            Ok(username) => self.sync_for_user(username.as_deref()),
            Err(error) => {
                tracing::warn!("Failed to read current user: {error}");
                SyncOutcome::Failed
            }
        }
    }

    /// Scopes that have a record in the cloud store.
    pub fn remote_scopes(&self) -> Result<Vec<Scope>> {
        let mut scopes: Vec<Scope> = self
            .cloud
            .all_keys()?
            .iter()
            .filter_map(|key| key.strip_prefix(CLOUD_RECORD_KEY_PREFIX))
            .filter(|scope| !scope.is_empty())
            .map(Scope::from_stored)
            .collect();
        scopes.sort();
        scopes.dedup();
        Ok(scopes)
    }

    /// React to a store change: stamp the scope and arm its push.
    fn handle_local_change(self: &Arc<Self>, key: &str) {
        let Some(ScopedKey { scope, setting_key }) = ScopedKey::parse(key) else {
            return;
        };
        if scope.is_guest() || self.is_excluded_key(&setting_key) {
            return;
        }
        if self.guards.is_active(&scope, GuardKind::Apply) {
            return;
        }

        let stamped = self
            .local_updated_at(&scope)
            .and_then(|current| self.set_local_updated_at(&scope, next_timestamp(current)));
        if let Err(error) = stamped {
            tracing::warn!("Failed to stamp local change for scope {scope}: {error}");
            return;
        }

        if self.cloud.is_available() {
            self.schedule_push(scope);
        }
    }

    /// (Re)arm the debounced push for `scope`.
    pub fn schedule_push(self: &Arc<Self>, scope: Scope) {
        let this = Arc::downgrade(self);
        let task_scope = scope.clone();
        self.debouncer.schedule(scope, async move {
            if let Some(this) = this.upgrade() {
                if this.push_pending(&task_scope) == PushAttempt::Busy {
                    this.schedule_push(task_scope);
                }
            }
        });
    }

    pub fn has_pending_push(&self, scope: &Scope) -> bool {
        self.debouncer.is_pending(scope)
    }

    /// Push a debounced local edit unless a reconcile or remote apply owns
    /// the scope right now.
    fn push_pending(&self, scope: &Scope) -> PushAttempt {
        let Some(_syncing) = self.guards.try_enter(scope, GuardKind::Sync) else {
            return PushAttempt::Busy;
        };
        if self.guards.is_active(scope, GuardKind::Apply) {
            return PushAttempt::Busy;
        }
        match self.push_scope(scope) {
            Ok(_) => PushAttempt::Pushed,
            Err(error) => {
                tracing::warn!("Failed to push settings for scope {scope}: {error}");
                PushAttempt::Failed
            }
        }
    }

    /// Subscribe to namespaced store changes.
    pub fn start(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let subscription = self.store.subscribe(
            Box::new(ScopedKey::is_namespaced),
            Box::new(move |key| {
                if let Some(this) = weak.upgrade() {
                    this.handle_local_change(key);
                }
            }),
        );
        *self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
    }

    /// Unsubscribe and drop every pending push.
    pub fn stop(&self) {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.debouncer.cancel_all();
    }

    /// Perform every pending push now. Returns the number of scopes pushed.
    ///
    /// A scope busy with a reconcile or remote apply is re-armed instead.
    pub fn flush(self: &Arc<Self>) -> usize {
        let mut pushed = 0;
        for scope in self.debouncer.cancel_all() {
            match self.push_pending(&scope) {
                PushAttempt::Pushed => pushed += 1,
                PushAttempt::Busy => {
                    tracing::debug!("Deferring push for busy scope {scope}");
                    self.schedule_push(scope);
                }
                PushAttempt::Failed => {}
            }
        }
        pushed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PushAttempt {
    Pushed,
    Busy,
    Failed,
}
