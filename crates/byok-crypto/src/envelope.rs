//! Versioned key envelope carried in the `X-TELEMESSAGE-ENC-DATAKEY` header.
//!
//! # Format (V2.0)
//!
//! ```text
//! V2.0#: base64( nonce (12 bytes) || RSA-PKCS#1-v1.5( content key (32 bytes) ) )
//! ```
//!
//! The literal prefix is the version marker. Parsers check it before
//! decoding so a later `V3.0#` scheme can coexist with existing headers.
//! PKCS#1 v1.5 padding (not OAEP) is required to read headers already in
//! the archive.

use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use crate::cipher::{ContentKey, Nonce, NONCE_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode, base64_encode};

/// Version marker of the current envelope scheme.
pub const VERSION_V2: &str = "V2.0#";

/// Full header value prefix written by [`wrap`].
pub const KEY_HEADER_PREFIX: &str = "V2.0#: ";

/// Envelope scheme identified by a header value's prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeVersion {
    /// `V2.0#`: nonce || RSA-PKCS#1-v1.5(key).
    V2,
}

/// Identify the envelope scheme of a header value.
///
/// Returns `Ok(None)` when the value carries no version marker at all and
/// `Err(UnsupportedVersion)` for a well-formed marker of an unknown version.
pub fn detect_version(header_value: &str) -> CryptoResult<Option<EnvelopeVersion>> {
    let value = header_value.trim_start();
    if value.starts_with(VERSION_V2) {
        return Ok(Some(EnvelopeVersion::V2));
    }

    match parse_version_marker(value) {
        Some(marker) => Err(CryptoError::UnsupportedVersion(marker.to_string())),
        None => Ok(None),
    }
}

/// Check whether a header value looks like a V2.0 wrapped key.
///
/// Only the prefix and base64 payload are checked; no key is needed.
pub fn is_wrapped_key_header(header_value: &str) -> bool {
    match header_value.trim_start().strip_prefix(KEY_HEADER_PREFIX) {
        Some(payload) => base64_decode(payload)
            .map(|data| data.len() > NONCE_LEN)
            .unwrap_or(false),
        None => false,
    }
}

/// Wrap a content key and nonce under an RSA public key.
///
/// Returns the complete header value, `V2.0#: <base64>`.
pub fn wrap(nonce: &Nonce, key: &ContentKey, public_key: &RsaPublicKey) -> CryptoResult<String> {
    let wrapped_key = public_key
        .encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("RSA key wrap failed: {}", e)))?;

    let mut data = Vec::with_capacity(NONCE_LEN + wrapped_key.len());
    data.extend_from_slice(nonce.as_bytes());
    data.extend_from_slice(&wrapped_key);

    Ok(format!("{}{}", KEY_HEADER_PREFIX, base64_encode(&data)))
}

/// Recover the content key and nonce from a header value.
///
/// # Errors
///
/// - `InvalidFormat` if the value does not start with `V2.0#: ` or the
///   payload is not base64
/// - `UnsupportedVersion` if the value carries another well-formed marker
///   such as `V3.0#`. This is the `InvalidFormat` case narrowed to a known
///   marker shape: such a value also does not start with `V2.0#: `, and
///   [`CryptoError::is_format_error`] is true for both.
/// - `DecryptionFailure` if the payload is too short, the private key does
///   not match, or the unwrapped key has the wrong length
pub fn unwrap(header_value: &str, private_key: &RsaPrivateKey) -> CryptoResult<(ContentKey, Nonce)> {
    let value = header_value.trim_start();
    if detect_version(value)?.is_none() {
        return Err(CryptoError::InvalidFormat(
            "key header does not start with a version marker".to_string(),
        ));
    }

    let payload = value.strip_prefix(KEY_HEADER_PREFIX).ok_or_else(|| {
        CryptoError::InvalidFormat(format!("key header must start with {:?}", KEY_HEADER_PREFIX))
    })?;

    let data = base64_decode(payload)?;
    if data.len() < NONCE_LEN {
        return Err(CryptoError::DecryptionFailure(format!(
            "key header payload is {} bytes, shorter than the nonce",
            data.len()
        )));
    }

    let (nonce_bytes, wrapped_key) = data.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes)?;

    let key_bytes = Zeroizing::new(
        private_key
            .decrypt(Pkcs1v15Encrypt, wrapped_key)
            .map_err(|e| CryptoError::DecryptionFailure(format!("RSA key unwrap failed: {}", e)))?,
    );

    let key = ContentKey::from_slice(&key_bytes).map_err(|_| {
        CryptoError::DecryptionFailure(format!(
            "unwrapped key is {} bytes, expected 32",
            key_bytes.len()
        ))
    })?;

    Ok((key, nonce))
}

/// Extract a `V<major>.<minor>#` marker from the start of a value.
fn parse_version_marker(value: &str) -> Option<&str> {
    let rest = value.strip_prefix('V')?;
    let hash = rest.find('#')?;
    let version = &rest[..hash];
    let (major, minor) = version.split_once('.')?;
    let is_number = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if is_number(major) && is_number(minor) {
        Some(&value[..hash + 2])
    } else {
        None
    }
}
