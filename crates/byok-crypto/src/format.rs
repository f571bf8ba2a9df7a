//! Shared encoding utilities.

use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

/// Encode bytes as standard base64 (with padding, no line breaks).
pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode a standard base64 string.
///
/// ASCII whitespace is ignored so folded header values and wrapped bodies
/// decode without pre-processing.
pub fn base64_decode(data: &str) -> CryptoResult<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(cleaned)
        .map_err(|e| CryptoError::InvalidFormat(format!("Invalid base64: {}", e)))
}
