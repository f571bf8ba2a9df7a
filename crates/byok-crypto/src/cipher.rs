//! AES-256-GCM content cipher.
//!
//! One [`ContentKey`] and one [`Nonce`] are generated per message and used for
//! every leaf of that message. Reusing a (key, nonce) pair across distinct
//! plaintexts weakens GCM; the wire format depends on it, so it stays.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce as GcmNonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Content key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Nonce length in bytes (96-bit GCM nonce).
pub const NONCE_LEN: usize = 12;

/// Authentication tag length in bytes, appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Symmetric content key, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; KEY_LEN]);

impl ContentKey {
    /// Create a content key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create a content key from a slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidInput(format!(
                "content key must be {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes of the key.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl PartialEq for ContentKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for ContentKey {}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// 96-bit AES-GCM nonce.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    /// Create a nonce from raw bytes.
    pub fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    /// Create a nonce from a slice, which must be exactly 12 bytes.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; NONCE_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidInput(format!(
                "nonce must be {} bytes, got {}",
                NONCE_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes of the nonce.
    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nonce({})", hex::encode(self.0))
    }
}

/// Generate cryptographically secure random bytes.
pub fn generate_random<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Generate a random 256-bit content key.
pub fn generate_key() -> ContentKey {
    let mut bytes = generate_random::<KEY_LEN>();
    let key = ContentKey(bytes);
    bytes.zeroize();
    key
}

/// Generate a random 96-bit nonce.
pub fn generate_nonce() -> Nonce {
    Nonce(generate_random())
}

/// Encrypt plaintext with AES-256-GCM and no associated data.
///
/// Returns ciphertext with the 16-byte authentication tag appended.
pub fn encrypt(plaintext: &[u8], key: &ContentKey, nonce: &Nonce) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    cipher
        .encrypt(GcmNonce::from_slice(nonce.as_bytes()), plaintext)
        .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".into()))
}

/// Decrypt AES-256-GCM ciphertext produced by [`encrypt`].
///
/// The ciphertext must include the authentication tag at the end.
pub fn decrypt(ciphertext: &[u8], key: &ContentKey, nonce: &Nonce) -> CryptoResult<Vec<u8>> {
    if ciphertext.len() < TAG_LEN {
        return Err(CryptoError::InvalidInput(format!(
            "ciphertext is {} bytes, shorter than the {}-byte tag",
            ciphertext.len(),
            TAG_LEN
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidInput(e.to_string()))?;

    cipher
        .decrypt(GcmNonce::from_slice(nonce.as_bytes()), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key() {
        let key1 = generate_key();
        let key2 = generate_key();

        assert_eq!(key1.as_bytes().len(), 32);
        assert_ne!(key1, key2); // Should be random
    }

    #[test]
    fn test_generate_nonce() {
        let nonce1 = generate_nonce();
        let nonce2 = generate_nonce();

        assert_eq!(nonce1.as_bytes().len(), 12);
        assert_ne!(nonce1, nonce2);
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = ContentKey::from_bytes([42u8; 32]);
        let nonce = Nonce::from_bytes([1u8; 12]);
        let plaintext = b"Hello, World!";

        let ciphertext = encrypt(plaintext, &key, &nonce).unwrap();
        let decrypted = decrypt(&ciphertext, &key, &nonce).unwrap();

        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_ciphertext_carries_tag() {
        let key = ContentKey::from_bytes([42u8; 32]);
        let nonce = Nonce::from_bytes([1u8; 12]);
        let plaintext = b"hello";

        let ciphertext = encrypt(plaintext, &key, &nonce).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_LEN);
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let nonce = Nonce::from_bytes([1u8; 12]);
        let ciphertext =
            encrypt(b"Secret data", &ContentKey::from_bytes([42u8; 32]), &nonce).unwrap();

        let result = decrypt(&ciphertext, &ContentKey::from_bytes([99u8; 32]), &nonce);
        assert!(matches!(result, Err(CryptoError::AuthenticationFailure)));
    }

    #[test]
    fn test_decrypt_wrong_nonce() {
        let key = ContentKey::from_bytes([42u8; 32]);
        let ciphertext = encrypt(b"Secret data", &key, &Nonce::from_bytes([1u8; 12])).unwrap();

        let result = decrypt(&ciphertext, &key, &Nonce::from_bytes([2u8; 12]));
        assert!(matches!(result, Err(CryptoError::AuthenticationFailure)));
    }

    #[test]
    fn test_decrypt_tampered_ciphertext() {
        let key = ContentKey::from_bytes([42u8; 32]);
        let nonce = Nonce::from_bytes([1u8; 12]);
        let mut ciphertext = encrypt(b"Secret data", &key, &nonce).unwrap();

        ciphertext[0] ^= 0xFF;

        let result = decrypt(&ciphertext, &key, &nonce);
        assert!(matches!(result, Err(CryptoError::AuthenticationFailure)));
    }

    #[test]
    fn test_decrypt_shorter_than_tag() {
        let key = ContentKey::from_bytes([42u8; 32]);
        let nonce = Nonce::from_bytes([1u8; 12]);

        let result = decrypt(&[0u8; 15], &key, &nonce);
        assert!(matches!(result, Err(CryptoError::InvalidInput(_))));
    }

    #[test]
    fn test_encrypt_empty_plaintext() {
        let key = ContentKey::from_bytes([42u8; 32]);
        let nonce = Nonce::from_bytes([1u8; 12]);

        let ciphertext = encrypt(b"", &key, &nonce).unwrap();
        assert_eq!(ciphertext.len(), TAG_LEN);
        assert!(decrypt(&ciphertext, &key, &nonce).unwrap().is_empty());
    }

    #[test]
    fn test_same_key_and_nonce_is_deterministic() {
        let key = ContentKey::from_bytes([7u8; 32]);
        let nonce = Nonce::from_bytes([3u8; 12]);

        let a = encrypt(b"leaf payload", &key, &nonce).unwrap();
        let b = encrypt(b"leaf payload", &key, &nonce).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(ContentKey::from_slice(&[0u8; 16]).is_err());
        assert!(Nonce::from_slice(&[0u8; 16]).is_err());
        assert!(Nonce::from_slice(&[0u8; 12]).is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = ContentKey::from_bytes([0xAB; 32]);
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("ab"));
    }
}
