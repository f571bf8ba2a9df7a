//! Error types for folder comparison.

use std::path::PathBuf;
use thiserror::Error;

/// Comparison errors. Problems with a single file become notes in the
/// report instead.
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Report serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CompareResult<T> = Result<T, CompareError>;
