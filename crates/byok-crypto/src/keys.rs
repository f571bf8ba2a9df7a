//! RSA key material for content key wrapping.
//!
//! This module provides:
//! - PEM loading for public keys (SPKI, falling back to PKCS#1)
//! - PEM loading for private keys (PKCS#8, falling back to PKCS#1)
//! - Key pair generation and PEM export for the key tool
//! - Fingerprints for logging
//!
//! # Security
//!
//! - Private keys are never printed by `Debug`
//! - Private key files are written with 0600 permissions on Unix

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::{CryptoError, CryptoResult};

/// Smallest modulus accepted for new key pairs.
pub const MIN_KEY_BITS: usize = 2048;

/// RSA key pair used by the encrypter.
///
/// The public key wraps every content key. The private key is optional and
/// only used to verify freshly written key headers.
#[derive(Clone)]
pub struct RsaKeyPair {
    /// Wrapping key.
    pub public: RsaPublicKey,
    /// Matching private key, when configured.
    pub private: Option<RsaPrivateKey>,
}

impl RsaKeyPair {
    /// Create a key pair holding only a public key.
    pub fn public_only(public: RsaPublicKey) -> Self {
        Self {
            public,
            private: None,
        }
    }

    /// Create a key pair from a private key, deriving the public half.
    pub fn from_private(private: RsaPrivateKey) -> Self {
        Self {
            public: private.to_public_key(),
            private: Some(private),
        }
    }

    /// Load a key pair from PEM files.
    pub fn load(public_path: &Path, private_path: Option<&Path>) -> CryptoResult<Self> {
        let public = load_public_key(public_path)?;
        let private = private_path.map(load_private_key).transpose()?;
        Ok(Self { public, private })
    }

    /// Whether the private key (if any) corresponds to the public key.
    ///
    /// Returns `None` when no private key is loaded.
    pub fn keys_match(&self) -> Option<bool> {
        self.private
            .as_ref()
            .map(|private| private.to_public_key() == self.public)
    }

    /// SHA-256 fingerprint of the public key.
    pub fn fingerprint(&self) -> CryptoResult<String> {
        fingerprint(&self.public)
    }
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("public", &fingerprint(&self.public).unwrap_or_default())
            .field(
                "private",
                &self.private.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Generate a new RSA key pair.
///
/// `bits` must be at least [`MIN_KEY_BITS`].
pub fn generate_key_pair(bits: usize) -> CryptoResult<RsaKeyPair> {
    if bits < MIN_KEY_BITS {
        return Err(CryptoError::InvalidInput(format!(
            "RSA modulus must be at least {} bits, got {}",
            MIN_KEY_BITS, bits
        )));
    }
    let private = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    Ok(RsaKeyPair::from_private(private))
}

/// Parse a PEM-encoded RSA public key.
///
/// Accepts `PUBLIC KEY` (SPKI) and `RSA PUBLIC KEY` (PKCS#1).
pub fn parse_public_key_pem(pem: &str) -> CryptoResult<RsaPublicKey> {
    let pem = pem.trim();
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|spki_err| {
            RsaPublicKey::from_pkcs1_pem(pem).map_err(|_| spki_err.to_string())
        })
        .map_err(|e| CryptoError::KeyLoad(format!("not an RSA public key: {}", e)))
}

/// Parse a PEM-encoded RSA private key.
///
/// Accepts `PRIVATE KEY` (PKCS#8) and `RSA PRIVATE KEY` (PKCS#1).
pub fn parse_private_key_pem(pem: &str) -> CryptoResult<RsaPrivateKey> {
    let pem = pem.trim();
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|pkcs8_err| {
            RsaPrivateKey::from_pkcs1_pem(pem).map_err(|_| pkcs8_err.to_string())
        })
        .map_err(|e| CryptoError::KeyLoad(format!("not an RSA private key: {}", e)))
}

/// Load an RSA public key from a PEM file.
pub fn load_public_key(path: &Path) -> CryptoResult<RsaPublicKey> {
    let pem = read_key_file(path)?;
    parse_public_key_pem(&pem).map_err(|e| with_path(e, path))
}

/// Load an RSA private key from a PEM file.
pub fn load_private_key(path: &Path) -> CryptoResult<RsaPrivateKey> {
    let pem = read_key_file(path)?;
    parse_private_key_pem(&pem).map_err(|e| with_path(e, path))
}

/// Save a public key as SPKI PEM.
pub fn save_public_key(key: &RsaPublicKey, path: &Path) -> CryptoResult<()> {
    let pem = key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::InvalidFormat(e.to_string()))?;
    std::fs::write(path, pem)?;
    Ok(())
}

/// Save a private key as PKCS#8 PEM, readable by the owner only.
pub fn save_private_key(key: &RsaPrivateKey, path: &Path) -> CryptoResult<()> {
    let pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CryptoError::InvalidFormat(e.to_string()))?;
    std::fs::write(path, pem.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Lowercase hex SHA-256 of the public key's SPKI DER encoding.
pub fn fingerprint(key: &RsaPublicKey) -> CryptoResult<String> {
    let der = key
        .to_public_key_der()
        .map_err(|e| CryptoError::InvalidFormat(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(der.as_bytes())))
}

fn read_key_file(path: &Path) -> CryptoResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| CryptoError::KeyLoad(format!("{}: {}", path.display(), e)))
}

fn with_path(err: CryptoError, path: &Path) -> CryptoError {
    match err {
        CryptoError::KeyLoad(reason) => {
            CryptoError::KeyLoad(format!("{}: {}", path.display(), reason))
        }
        other => other,
    }
}
