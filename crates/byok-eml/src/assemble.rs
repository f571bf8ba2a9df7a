//! Message assembly: transform, wrap the key, stamp metadata, finalize.

use byok_core::config::EncrypterConfig;
use byok_core::defaults::{HDR_DATAKEY, HDR_INTEGRITY, HDR_KEY_ID};
use byok_crypto::{generate_key, generate_nonce, unwrap, wrap, ContentKey, Nonce, RsaKeyPair};
use std::time::Instant;
use tracing::{debug, instrument, warn};

use crate::error::EmlResult;
use crate::model::{Message, Part, CONTENT_TRANSFER_ENCODING, CONTENT_TYPE};
use crate::parse::parse_message;
use crate::serialize::{content_type_value, generate_boundary, write_message};
use crate::transform::{transform_message, TransformStats};

const MIME_VERSION: &str = "MIME-Version";
const CONTENT_LENGTH: &str = "Content-Length";

/// Transfer encodings a multipart entity may declare.
const IDENTITY_ENCODINGS: [&str; 3] = ["7bit", "8bit", "binary"];

/// Values stamped onto every encrypted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeSettings {
    /// Value of `X-TELEMESSAGE-ENC-KEY-ID`.
    pub key_id: String,
    /// Value of `X-TELEMESSAGE-OriginalMesageIntegrity`.
    pub integrity: String,
    /// Unwrap each written key header again and compare.
    pub verify_key_header: bool,
}

impl From<&EncrypterConfig> for EnvelopeSettings {
    fn from(config: &EncrypterConfig) -> Self {
        Self {
            key_id: config.enc_key_id.clone(),
            integrity: config.original_mesage_integrity.clone(),
            verify_key_header: config.verify_key_header,
        }
    }
}

/// Outcome of the optional key header self-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCheck {
    /// Self-check disabled.
    Skipped,
    /// Unwrapped key and nonce equal the ones used.
    Verified,
    /// Unwrap succeeded but returned a different key or nonce.
    Mismatch,
    /// Unwrap failed, or no private key is loaded.
    Failed(String),
}

impl KeyCheck {
    /// Whether the check found a problem.
    pub fn is_problem(&self) -> bool {
        matches!(self, KeyCheck::Mismatch | KeyCheck::Failed(_))
    }
}

/// One encrypted message ready to be written.
#[derive(Debug, Clone)]
pub struct EncryptedMessage {
    pub bytes: Vec<u8>,
    pub stats: TransformStats,
    pub key_check: KeyCheck,
}

/// Encrypts messages under one RSA key pair.
#[derive(Debug, Clone)]
pub struct EnvelopeEncrypter {
    keys: RsaKeyPair,
    settings: EnvelopeSettings,
}

impl EnvelopeEncrypter {
    pub fn new(keys: RsaKeyPair, settings: EnvelopeSettings) -> Self {
        Self { keys, settings }
    }

    pub fn keys(&self) -> &RsaKeyPair {
        &self.keys
    }

    pub fn settings(&self) -> &EnvelopeSettings {
        &self.settings
    }

    /// Parse, encrypt and serialize one message.
    ///
    /// A fresh content key and nonce are drawn for every call.
    #[instrument(skip_all, fields(component = "eml", op = "encrypt_message", input_bytes = raw.len()))]
    pub fn encrypt_message(&self, raw: &[u8]) -> EmlResult<EncryptedMessage> {
        let start = Instant::now();
        let message = parse_message(raw)?;

        let key = generate_key();
        let nonce = generate_nonce();
        let (mut encrypted, stats) = transform_message(&message, &key, &nonce)?;
        let key_check = self.assemble(&mut encrypted, &key, &nonce)?;
        let bytes = write_message(&encrypted);

        debug!(
            leaf_count = stats.leaf_count,
            container_count = stats.container_count,
            output_bytes = bytes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Message encrypted"
        );

        Ok(EncryptedMessage {
            bytes,
            stats,
            key_check,
        })
    }

    /// Add the wrapped key and metadata headers to a transformed message and
    /// finalize it.
    pub fn assemble(
        &self,
        message: &mut Message,
        key: &ContentKey,
        nonce: &Nonce,
    ) -> EmlResult<KeyCheck> {
        let header_value = wrap(nonce, key, &self.keys.public)?;
        message.headers.set(HDR_DATAKEY, header_value.as_str());

        let key_check = self.check_key_header(&header_value, key, nonce);

        message.headers.set(HDR_INTEGRITY, self.settings.integrity.as_str());
        message.headers.set(HDR_KEY_ID, self.settings.key_id.as_str());

        finalize(message);
        Ok(key_check)
    }

    /// Unwrap a freshly written header and compare it with what was used.
    /// Problems are logged and never fail the message.
    fn check_key_header(&self, header_value: &str, key: &ContentKey, nonce: &Nonce) -> KeyCheck {
        if !self.settings.verify_key_header {
            return KeyCheck::Skipped;
        }

        let check = match self.keys.private.as_ref() {
            None => KeyCheck::Failed("no private key loaded".to_string()),
            Some(private) => match unwrap(header_value, private) {
                Ok((k, n)) if &k == key && &n == nonce => KeyCheck::Verified,
                Ok(_) => KeyCheck::Mismatch,
                Err(e) => KeyCheck::Failed(e.to_string()),
            },
        };

        match &check {
            KeyCheck::Mismatch => warn!(
                op = "key_check",
                "Key header does not unwrap to the key used; output is still written"
            ),
            KeyCheck::Failed(reason) => warn!(
                op = "key_check",
                error = %reason,
                "Key header self-check failed; output is still written"
            ),
            _ => debug!(op = "key_check", "Key header verified"),
        }
        check
    }
}

/// Recompute the structural headers implied by the rebuilt body.
///
/// Assigns a boundary to every container, sets `MIME-Version` when absent,
/// sets the top-level `Content-Type`, drops `Content-Length` and makes the
/// top-level transfer encoding consistent with the body.
pub fn finalize(message: &mut Message) {
    assign_boundaries(&mut message.body);

    if !message.headers.contains(MIME_VERSION) {
        message.headers.set(MIME_VERSION, "1.0");
    }
    message.headers.remove(CONTENT_LENGTH);

    let (content_type, _) = content_type_value(&message.body);
    message.headers.set(CONTENT_TYPE, content_type);

    match &message.body {
        Part::Leaf(_) => {
            if !message.headers.contains(CONTENT_TRANSFER_ENCODING) {
                message.headers.set(CONTENT_TRANSFER_ENCODING, "base64");
            }
        }
        Part::Container(_) => {
            let identity = message
                .headers
                .get(CONTENT_TRANSFER_ENCODING)
                .map(|v| {
                    IDENTITY_ENCODINGS
                        .iter()
                        .any(|e| e.eq_ignore_ascii_case(v.trim()))
                })
                .unwrap_or(true);
            if !identity {
                message.headers.remove(CONTENT_TRANSFER_ENCODING);
            }
        }
    }
}

fn assign_boundaries(part: &mut Part) {
    if let Part::Container(container) = part {
        if container.boundary.is_none() {
            container.boundary = Some(generate_boundary());
        }
        for child in &mut container.children {
            assign_boundaries(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Container, HeaderList, Leaf};
    use byok_crypto::generate_key_pair;
    use std::sync::OnceLock;

    fn test_keys() -> &'static RsaKeyPair {
        static PAIR: OnceLock<RsaKeyPair> = OnceLock::new();
        PAIR.get_or_init(|| generate_key_pair(2048).unwrap())
    }

    fn other_keys() -> &'static RsaKeyPair {
        static PAIR: OnceLock<RsaKeyPair> = OnceLock::new();
        PAIR.get_or_init(|| generate_key_pair(2048).unwrap())
    }

    fn settings(verify: bool) -> EnvelopeSettings {
        EnvelopeSettings {
            key_id: "key-1".into(),
            integrity: "sha256:abc".into(),
            verify_key_header: verify,
        }
    }

    const SIMPLE: &[u8] = b"From: a@example.com\r\nSubject: s\r\nContent-Type: text/plain\r\n\r\nhello\r\n";

    #[test]
    fn test_metadata_headers_written() {
        let encrypter = EnvelopeEncrypter::new(test_keys().clone(), settings(false));
        let out = encrypter.encrypt_message(SIMPLE).unwrap();

        let message = parse_message(&out.bytes).unwrap();
        assert!(message.headers.get(HDR_DATAKEY).unwrap().starts_with("V2.0#: "));
        assert_eq!(message.headers.get(HDR_INTEGRITY), Some("sha256:abc"));
        assert_eq!(message.headers.get(HDR_KEY_ID), Some("key-1"));
        assert_eq!(message.headers.get(MIME_VERSION), Some("1.0"));
        assert_eq!(out.key_check, KeyCheck::Skipped);
    }

    #[test]
    fn test_self_check_verified() {
        let encrypter = EnvelopeEncrypter::new(test_keys().clone(), settings(true));
        let out = encrypter.encrypt_message(SIMPLE).unwrap();
        assert_eq!(out.key_check, KeyCheck::Verified);
    }

    #[test]
    fn test_self_check_mismatched_pair_still_writes() {
        let keys = RsaKeyPair {
            public: test_keys().public.clone(),
            private: other_keys().private.clone(),
        };
        let encrypter = EnvelopeEncrypter::new(keys, settings(true));
        let out = encrypter.encrypt_message(SIMPLE).unwrap();

        assert!(out.key_check.is_problem());
        assert!(!out.bytes.is_empty());
    }

    #[test]
    fn test_self_check_without_private_key() {
        let keys = RsaKeyPair::public_only(test_keys().public.clone());
        let encrypter = EnvelopeEncrypter::new(keys, settings(true));
        let out = encrypter.encrypt_message(SIMPLE).unwrap();
        assert!(matches!(out.key_check, KeyCheck::Failed(_)));
    }

    #[test]
    fn test_finalize_container_root() {
        let leaf = Part::Leaf(Leaf {
            headers: HeaderList::new(),
            content_type: "text/plain".into(),
            filename: None,
            disposition: None,
            payload: b"x".to_vec(),
        });
        let mut headers = HeaderList::new();
        headers.push("MIME-Version", "1.0");
        headers.push("Content-Length", "100");
        headers.push("Content-Transfer-Encoding", "quoted-printable");
        let mut message = Message {
            headers,
            body: Part::Container(Container::new("related", vec![leaf])),
        };

        finalize(&mut message);

        let Part::Container(root) = &message.body else {
            panic!("expected container");
        };
        let boundary = root.boundary.clone().unwrap();
        assert_eq!(
            message.headers.get(CONTENT_TYPE).unwrap(),
            format!("multipart/related; boundary=\"{}\"", boundary)
        );
        assert!(!message.headers.contains("Content-Length"));
        assert!(!message.headers.contains(CONTENT_TRANSFER_ENCODING));
        assert_eq!(message.headers.get_all(MIME_VERSION).count(), 1);
    }

    #[test]
    fn test_settings_from_config() {
        let config = EncrypterConfig {
            enc_key_id: "kid".into(),
            original_mesage_integrity: "int".into(),
            verify_key_header: true,
            ..Default::default()
        };
        let s = EnvelopeSettings::from(&config);
        assert_eq!(s.key_id, "kid");
        assert_eq!(s.integrity, "int");
        assert!(s.verify_key_header);
    }
}
