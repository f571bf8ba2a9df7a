//! Error types for batch runs.

use byok_core::ConfigError;
use byok_crypto::CryptoError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a batch run before or between files.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Input path is missing or not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Key material could not be loaded.
    #[error("Key error: {0}")]
    Key(#[from] CryptoError),

    /// I/O error on the folders themselves.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for batch runs.
pub type BatchResult<T> = Result<T, BatchError>;
