use std::sync::Arc;

use hydra_settings::{Scope, SettingValue, SettingValueType, SettingsEngine};
use serde::Serialize;

use crate::cli::{LocationArgs, ValueTypeArg};
use crate::error::CliError;
use crate::paths::{load_config, resolve_config_path, resolve_engine_paths};
use crate::secure_store::KeyringSecureStore;

#[derive(Debug, Serialize, PartialEq)]
pub struct SettingListItem {
    pub key: String,
    #[serde(flatten)]
    pub value: SettingValue,
}

/// Open the engine over the resolved on-disk locations.
pub fn open_engine(locations: &LocationArgs) -> Result<SettingsEngine, CliError> {
    let config_path = resolve_config_path(locations.config.clone());
    let config = load_config(&config_path)?;
    let paths = resolve_engine_paths(locations, &config);
    tracing::debug!(
        "Opening settings store {} (snapshot {})",
        paths.store.display(),
        paths.snapshot.display()
    );
    Ok(SettingsEngine::open(
        &paths,
        Arc::new(KeyringSecureStore::new()),
        config,
    )?)
}

pub fn normalize_setting_key(key: &str) -> Result<String, CliError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptySettingKey)
    } else if trimmed.contains(':') {
        Err(CliError::InvalidSettingKey(trimmed.to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_username(username: &str) -> Result<String, CliError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyUsername)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Scope of `user` when given, otherwise the active account's scope.
pub fn scope_for(engine: &SettingsEngine, user: Option<&str>) -> Result<Scope, CliError> {
    match user {
        Some(user) => Ok(Scope::from_username(Some(&normalize_username(user)?))),
        None => Ok(engine.active_scope()?),
    }
}

pub fn parse_setting_value(value_type: ValueTypeArg, raw: &str) -> Result<SettingValue, CliError> {
    let value_type: SettingValueType = value_type.into();
    SettingValue::parse_as(value_type, raw).ok_or_else(|| CliError::InvalidValue {
        value_type: value_type.to_string(),
        raw: raw.to_string(),
    })
}

pub fn describe_scope(scope: &Scope) -> String {
    if scope.is_guest() {
        "guest".to_string()
    } else {
        scope.to_string()
    }
}

pub fn format_setting_lines(entries: &[(String, SettingValue)]) -> Vec<String> {
    let width = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    entries
        .iter()
        .map(|(key, value)| {
            format!(
                "{key:<width$}  {:<7}  {value}",
                value.value_type().as_str()
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
