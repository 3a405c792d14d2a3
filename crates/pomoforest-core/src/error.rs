//! Core error types for pomoforest-core.
//!
//! This module defines the error hierarchy using thiserror. Persistence
//! errors never reach the timer engine; the service logs them and moves on.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`crate::service::TimerHandle`].
#[derive(Error, Debug)]
pub enum CoreError {
    /// The timer service has shut down
    #[error("Timer service is no longer running")]
    ServiceClosed,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// The data directory could not be created
    #[error("Cannot prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by a [`crate::vault::FileStore`].
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("{op} failed for '{path}': {source}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{0}' already exists")]
    AlreadyExists(String),

    #[error("'{0}' does not exist")]
    NotFound(String),
}

/// Session log persistence errors.
#[derive(Error, Debug)]
pub enum PersistError {
    /// The daily note for the given date could not be resolved or created
    #[error("Cannot resolve daily note for {date}: {source}")]
    DailyNote {
        date: chrono::NaiveDate,
        #[source]
        source: VaultError,
    },

    /// A folder on the way to the log file could not be created
    #[error("Cannot create folder '{path}': {source}")]
    CreateFolder {
        path: String,
        #[source]
        source: VaultError,
    },

    /// The log file could not be created or appended to
    #[error("Cannot write session log to '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: VaultError,
    },
}

impl VaultError {
    pub(crate) fn io(op: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        VaultError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
