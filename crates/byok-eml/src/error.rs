//! Error types for message processing.
//!
//! Every variant is scoped to one message: the batch run logs it with the
//! file name and moves on to the next file.

use byok_crypto::CryptoError;
use thiserror::Error;

/// Message processing errors.
#[derive(Error, Debug)]
pub enum EmlError {
    /// The message could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A multipart entity has no boundary parameter.
    #[error("Multipart entity without boundary: {0}")]
    MissingBoundary(String),

    /// Content encryption or key wrapping failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<mailparse::MailParseError> for EmlError {
    fn from(e: mailparse::MailParseError) -> Self {
        EmlError::Parse(e.to_string())
    }
}

/// Result type for message processing.
pub type EmlResult<T> = Result<T, EmlError>;
