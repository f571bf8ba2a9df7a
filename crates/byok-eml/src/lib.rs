//! # byok-eml
//!
//! Envelope encryption of EML messages.
//!
//! Each message is parsed into a MIME tree, every leaf payload is encrypted
//! with AES-256-GCM under a fresh per-message key, and the tree is rebuilt
//! with the original structure and non-content headers. The content key and
//! nonce travel RSA-wrapped in the `X-TELEMESSAGE-ENC-DATAKEY` header.
//!
//! ## Example
//!
//! ```rust,no_run
//! use byok_crypto::RsaKeyPair;
//! use byok_eml::{EnvelopeEncrypter, EnvelopeSettings};
//! use std::path::Path;
//!
//! let keys = RsaKeyPair::load(Path::new("public.pem"), None).unwrap();
//! let encrypter = EnvelopeEncrypter::new(keys, EnvelopeSettings::default());
//!
//! let raw = std::fs::read("message.eml").unwrap();
//! let encrypted = encrypter.encrypt_message(&raw).unwrap();
//! std::fs::write("message.enc.eml", encrypted.bytes).unwrap();
//! ```

pub mod assemble;
pub mod error;
pub mod model;
pub mod parse;
pub mod serialize;
pub mod transform;

pub use assemble::{finalize, EncryptedMessage, EnvelopeEncrypter, EnvelopeSettings, KeyCheck};
pub use error::{EmlError, EmlResult};
pub use model::{Container, Header, HeaderList, Leaf, Message, Part};
pub use parse::parse_message;
pub use serialize::write_message;
pub use transform::{is_textual, leaf_ciphertext, transform_message, TransformStats};
