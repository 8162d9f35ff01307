// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for pkghelper
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed request line, missing field or unrecognized action
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The process that started the worker is gone
    #[error("Parent process {parent} no longer exists, refusing to run orphaned")]
    Orphaned { parent: i32 },

    /// Exclusive access to the package database was not obtained in time
    #[error("Couldn't obtain an exclusive lock on {} in {seconds} seconds", path.display())]
    LockTimeout { path: PathBuf, seconds: u64 },

    /// The underlying package database failed to load
    #[error("Package index unavailable: {0}")]
    IndexUnavailable(String),

    /// Parse errors for listings, versions and configuration values
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using pkghelper's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Process exit status reported for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Orphaned { .. } => 2,
            Error::LockTimeout { .. } => 200,
            Error::Protocol(_)
            | Error::IndexUnavailable(_)
            | Error::ParseError(_)
            | Error::ConfigError(_)
            | Error::Io(_) => 1,
        }
    }

    /// Whether the orchestrator may restart the worker and retry the request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LockTimeout { .. })
    }
}
