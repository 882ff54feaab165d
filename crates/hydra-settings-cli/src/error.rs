use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] hydra_settings::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Setting key cannot be empty")]
    EmptySettingKey,
    #[error("Username cannot be empty")]
    EmptyUsername,
    #[error("Setting key must not contain ':' ({0})")]
    InvalidSettingKey(String),
    #[error("Invalid {value_type} value: {raw}")]
    InvalidValue { value_type: String, raw: String },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
    #[error("Failed to write settings snapshot to {0}")]
    SnapshotWriteFailed(String),
    #[error("Cloud sync is disabled for this run (--no-cloud)")]
    CloudUnavailable,
}
