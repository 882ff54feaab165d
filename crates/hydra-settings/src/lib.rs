//! hydra-settings - Settings engine for Hydra
//!
//! Account-scoped key-value settings with transparent legacy migration, a
//! device-local durability snapshot, and best-effort cross-device sync through
//! a small cloud key-value store.

pub mod backup;
pub mod config;
pub mod debounce;
pub mod durability;
pub mod error;
pub mod models;
pub mod scoped;
pub mod services;
pub mod store;
pub mod sync;
pub mod util;

pub use config::SettingsConfig;
pub use error::{Error, Result};
pub use models::{Scope, SettingValue, SettingValueType};
pub use scoped::ScopedSettings;
pub use services::SettingsEngine;
