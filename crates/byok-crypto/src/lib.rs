//! # byok-crypto
//!
//! Cryptographic primitives for the BYOK EML encrypter.
//!
//! Message payloads are protected with envelope encryption: a fresh
//! symmetric content key encrypts the data, and the content key is wrapped
//! under the customer's RSA public key.
//!
//! ## Cryptographic Primitives
//!
//! - **Content cipher**: AES-256-GCM (AEAD, 96-bit nonce, 128-bit tag, no AAD)
//! - **Key wrapping**: RSA with PKCS#1 v1.5 padding
//! - **Key files**: PEM (SPKI / PKCS#8, with PKCS#1 fallback)
//! - **Random generation**: `rand::thread_rng` (ChaCha-based CSPRNG)
//!
//! ## Key Header Format (V2.0)
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ "V2.0#: " literal prefix                                 │
//! ├──────────────────────────────────────────────────────────┤
//! │ base64( nonce (12 bytes) || RSA-PKCS1v15(key, 32 bytes) )│
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ### Encrypt a Payload and Wrap Its Key
//!
//! ```rust,no_run
//! use byok_crypto::{encrypt, generate_key, generate_nonce, load_public_key, wrap};
//!
//! let public_key = load_public_key(std::path::Path::new("public.pem")).unwrap();
//!
//! let key = generate_key();
//! let nonce = generate_nonce();
//! let ciphertext = encrypt(b"Confidential", &key, &nonce).unwrap();
//! let header_value = wrap(&nonce, &key, &public_key).unwrap();
//! assert!(header_value.starts_with("V2.0#: "));
//! ```
//!
//! ### Recover the Key
//!
//! ```rust,no_run
//! use byok_crypto::{decrypt, load_private_key, unwrap};
//!
//! # let header_value = String::new();
//! # let ciphertext = Vec::new();
//! let private_key = load_private_key(std::path::Path::new("private.pem")).unwrap();
//! let (key, nonce) = unwrap(&header_value, &private_key).unwrap();
//! let plaintext = decrypt(&ciphertext, &key, &nonce).unwrap();
//! ```

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod format;
pub mod keys;

// Re-export commonly used types
pub use cipher::{decrypt, encrypt, generate_key, generate_nonce, ContentKey, Nonce};
pub use envelope::{detect_version, is_wrapped_key_header, unwrap, wrap, EnvelopeVersion};
pub use error::{CryptoError, CryptoResult};
pub use format::{base64_decode, base64_encode};
pub use keys::{
    fingerprint, generate_key_pair, load_private_key, load_public_key, save_private_key,
    save_public_key, RsaKeyPair,
};

// Key types are part of the public API
pub use rsa::{RsaPrivateKey, RsaPublicKey};
