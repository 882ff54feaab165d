//! Config and data file locations for the CLI.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use hydra_settings::services::EnginePaths;
use hydra_settings::SettingsConfig;

use crate::cli::LocationArgs;
use crate::error::CliError;

const APP_DIR_NAME: &str = "hydra";
const CONFIG_FILE_NAME: &str = "settings-config.json";
const STORE_FILE_NAME: &str = "settings.db";
const CLOUD_FILE_NAME: &str = "cloud-settings.json";

pub const CONFIG_PATH_ENV: &str = "HYDRA_SETTINGS_CONFIG";
pub const STORE_PATH_ENV: &str = "HYDRA_STORE_PATH";
pub const CLOUD_PATH_ENV: &str = "HYDRA_CLOUD_PATH";
pub const SNAPSHOT_PATH_ENV: &str = "HYDRA_SNAPSHOT_PATH";

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Flag first, then the environment, then the default.
pub fn resolve_path(
    flag: Option<PathBuf>,
    env_value: Option<OsString>,
    default: impl FnOnce() -> PathBuf,
) -> PathBuf {
    flag.or_else(|| env_value.filter(|value| !value.is_empty()).map(PathBuf::from))
        .unwrap_or_else(default)
}

pub fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    resolve_path(flag, env::var_os(CONFIG_PATH_ENV), default_config_path)
}

pub fn load_config(path: &Path) -> Result<SettingsConfig, CliError> {
    SettingsConfig::load_from_path(path).map_err(|error| CliError::Config(error.to_string()))
}

/// Resolve every engine location. Cloud sync is off when `no_cloud` is set.
pub fn resolve_engine_paths(locations: &LocationArgs, config: &SettingsConfig) -> EnginePaths {
    let data_dir = default_data_dir();
    let store = resolve_path(
        locations.store.clone(),
        env::var_os(STORE_PATH_ENV),
        || data_dir.join(STORE_FILE_NAME),
    );
    let cloud = (!locations.no_cloud).then(|| {
        resolve_path(
            locations.cloud.clone(),
            env::var_os(CLOUD_PATH_ENV),
            || data_dir.join(CLOUD_FILE_NAME),
        )
    });
    let snapshot = resolve_path(
        locations.snapshot.clone(),
        env::var_os(SNAPSHOT_PATH_ENV),
        || data_dir.join(&config.snapshot_file_name),
    );
    EnginePaths {
        store,
        cloud,
        snapshot,
    }
}
