//! Data models for hydra-settings

pub mod downloads;
mod scope;
mod snapshot;
mod value;

pub use downloads::{DownloadDestination, MediaLongPressAction};
pub use scope::{
    Scope, ScopedKey, ACCOUNT_SETTINGS_KEY_PREFIX, CURRENT_USER_KEY, GUEST_SETTINGS_SCOPE,
};
pub use snapshot::{LocalSnapshot, ScopeSnapshot, LOCAL_SNAPSHOT_VERSION};
pub use value::{SettingValue, SettingValueType};
