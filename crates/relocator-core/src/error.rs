//! Error types for relocation operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to callers of the relocation coordinator.
///
/// Backend failures are not reported here: they become state transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelocationError {
    /// `confirm` was called without a staged destination.
    #[error("No destination staged")]
    NoDestinationStaged,

    /// `start` was called while a relocation is running.
    #[error("A relocation to {target} is already in progress")]
    TransferInFlight { target: PathBuf },
}

/// Errors reported by a transfer engine.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The destination cannot be used as a root directory.
    #[error("Invalid destination {path}: {message}")]
    InvalidDestination { path: PathBuf, message: String },

    /// The destination already holds files.
    #[error("Destination is not empty: {path}")]
    DestinationNotEmpty { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or persisting the root directory preference failed.
    #[error(transparent)]
    Preference(#[from] PreferenceError),

    /// A blocking task panicked or was cancelled.
    #[error("Task failed: {message}")]
    Task { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl TransferError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid destination error.
    pub fn invalid_destination(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidDestination {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an error from a free-form message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Errors from the root directory preference store.
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// The settings file could not be read or written.
    #[error("Settings I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML.
    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The settings could not be serialized.
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The preference has no value and no default.
    #[error("Preference not set: {key}")]
    Missing { key: String },
}

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The config values are inconsistent.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}
