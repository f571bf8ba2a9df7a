//! Error types for cryptographic operations.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Authentication tag did not verify - wrong key/nonce or tampered data.
    #[error("Authentication failed - data may be tampered")]
    AuthenticationFailure,

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed wrapped-key header or encoding.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Wrapped-key header carries a version this codec does not understand.
    #[error("Unsupported key header version: {0}")]
    UnsupportedVersion(String),

    /// Asymmetric decryption failed - wrong private key or corrupted data.
    #[error("Decryption failed: {0}")]
    DecryptionFailure(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Key file missing, malformed, or not an RSA key.
    #[error("Key load error: {0}")]
    KeyLoad(String),

    /// RSA key generation failed.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CryptoError {
    /// Whether the input itself is malformed, as opposed to a key or
    /// authentication failure. An unknown version marker counts as malformed.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            CryptoError::InvalidFormat(_) | CryptoError::UnsupportedVersion(_)
        )
    }
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
