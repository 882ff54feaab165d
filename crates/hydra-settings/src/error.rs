//! Error types for hydra-settings

use thiserror::Error;

/// Result type alias using hydra-settings' Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hydra-settings operations
#[derive(Error, Debug)]
pub enum Error {
    /// Key-value store error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cloud key-value store error
    #[error("Cloud store error: {0}")]
    Cloud(String),

    /// Secure storage (keychain) error
    #[error("Secure storage error: {0}")]
    SecureStorage(String),

    /// Async runtime unavailable or misused
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn poisoned<T>(error: &std::sync::PoisonError<T>) -> Self {
        Self::Database(format!("lock poisoned: {error}"))
    }
}
