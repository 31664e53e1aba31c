//! Error types for the qalib-core library.
//!
//! Learning and matching misses are never errors: they are signaled with
//! `Option` returns and empty matches. Only persistence and configuration
//! problems surface here.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the qalib library.
#[derive(Error, Debug)]
pub enum QalibError {
    /// Template store persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to template persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read persisted templates.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write persisted templates.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Persisted template data could not be parsed.
    #[error("corrupt template data in {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for the qalib library.
pub type Result<T> = std::result::Result<T, QalibError>;
