//! Rebuild a parsed tree with every leaf payload encrypted.
//!
//! The rebuilt tree mirrors the original: same nesting, same container
//! subtypes, same child order. Every entity keeps its non-content headers;
//! `Content-Type`, `Content-Transfer-Encoding` and `Content-Length` are
//! regenerated. Leaves are encrypted with the message's single key and
//! nonce.
//!
//! Payload encoding depends on the original content type:
//! - `text/*`: the payload becomes the base64 text of the ciphertext. With
//!   the forced `base64` transfer encoding it is therefore encoded twice on
//!   the wire.
//! - anything else: the payload is the raw ciphertext, encoded once.

use byok_core::defaults::ENCRYPTED_TRANSFER_ENCODING;
use byok_crypto::{base64_decode, base64_encode, encrypt, ContentKey, Nonce};
use tracing::trace;

use crate::error::{EmlError, EmlResult};
use crate::model::{
    disposition_name, Container, HeaderList, Leaf, Message, Part, CONTENT_DISPOSITION,
    CONTENT_TRANSFER_ENCODING,
};

/// Counts gathered while rebuilding a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub leaf_count: usize,
    pub container_count: usize,
}

/// Encrypt every leaf of `message` into a new message.
///
/// The result holds the original top-level non-content headers; wrapped key
/// and metadata headers are added later by the assembler.
pub fn transform_message(
    message: &Message,
    key: &ContentKey,
    nonce: &Nonce,
) -> EmlResult<(Message, TransformStats)> {
    let mut stats = TransformStats::default();
    let mut body = transform_part(&message.headers, &message.body, key, nonce, &mut stats)?;
    let headers = std::mem::take(body.headers_mut());
    Ok((Message { headers, body }, stats))
}

/// Rebuild one part. `headers` are the headers describing it.
///
/// The returned part carries the rebuilt headers in its own list.
pub fn transform_part(
    headers: &HeaderList,
    part: &Part,
    key: &ContentKey,
    nonce: &Nonce,
    stats: &mut TransformStats,
) -> EmlResult<Part> {
    let mut new_headers = headers.non_content();

    match part {
        Part::Container(container) => {
            stats.container_count += 1;
            let children = container
                .children
                .iter()
                .map(|child| transform_part(child.headers(), child, key, nonce, stats))
                .collect::<EmlResult<Vec<_>>>()?;

            trace!(subtype = %container.subtype, children = children.len(), "Rebuilt container");

            let mut rebuilt = Container::new(container.subtype.clone(), children);
            rebuilt.headers = new_headers;
            Ok(Part::Container(rebuilt))
        }
        Part::Leaf(leaf) => {
            stats.leaf_count += 1;
            let ciphertext = encrypt(&leaf.payload, key, nonce)?;
            let payload = if is_textual(&leaf.content_type) {
                base64_encode(&ciphertext).into_bytes()
            } else {
                ciphertext
            };

            preserve_disposition(
                &mut new_headers,
                leaf.disposition.as_deref(),
                leaf.filename.as_deref(),
            );
            new_headers.set(CONTENT_TRANSFER_ENCODING, ENCRYPTED_TRANSFER_ENCODING);

            trace!(content_type = %leaf.content_type, bytes = payload.len(), "Encrypted leaf");

            Ok(Part::Leaf(Leaf {
                headers: new_headers,
                content_type: leaf.content_type.clone(),
                filename: leaf.filename.clone(),
                disposition: leaf.disposition.clone(),
                payload,
            }))
        }
    }
}

/// Whether a content type begins with the literal `text/`.
///
/// Case-sensitive, so `TEXT/plain` takes the binary path.
pub fn is_textual(content_type: &str) -> bool {
    content_type.starts_with("text/")
}

/// Recover the AES-GCM ciphertext stored in an encrypted leaf.
pub fn leaf_ciphertext(leaf: &Leaf) -> EmlResult<Vec<u8>> {
    if is_textual(&leaf.content_type) {
        let text = std::str::from_utf8(&leaf.payload)
            .map_err(|e| EmlError::Parse(format!("text leaf is not base64 text: {}", e)))?;
        Ok(base64_decode(text)?)
    } else {
        Ok(leaf.payload.clone())
    }
}

/// Make sure the copied headers still state the leaf's disposition and
/// filename.
fn preserve_disposition(
    headers: &mut HeaderList,
    disposition: Option<&str>,
    filename: Option<&str>,
) {
    match headers.get(CONTENT_DISPOSITION).map(str::to_string) {
        Some(existing) => {
            let parsed = mailparse::parse_content_disposition(&existing);
            let same_type = disposition.map_or(true, |d| {
                disposition_name(&parsed.disposition).eq_ignore_ascii_case(d)
            });
            let same_name = filename.map_or(true, |f| {
                parsed.params.get("filename").map(String::as_str) == Some(f)
            });
            if same_type && same_name {
                return;
            }
            let disposition = disposition
                .map(str::to_string)
                .unwrap_or_else(|| disposition_name(&parsed.disposition));
            headers.set(CONTENT_DISPOSITION, disposition_value(&disposition, filename));
        }
        None => {
            if let Some(filename) = filename {
                let disposition = disposition.unwrap_or("attachment");
                headers.set(CONTENT_DISPOSITION, disposition_value(disposition, Some(filename)));
            } else if let Some(disposition) = disposition {
                headers.set(CONTENT_DISPOSITION, disposition);
            }
        }
    }
}

/// Format a disposition value. Non-ASCII filenames use RFC 2231 encoding.
fn disposition_value(disposition: &str, filename: Option<&str>) -> String {
    match filename {
        None => disposition.to_string(),
        Some(name) if name.is_ascii() => format!(
            "{}; filename=\"{}\"",
            disposition,
            name.replace('\\', "\\\\").replace('"', "\\\"")
        ),
        Some(name) => format!("{}; filename*=utf-8''{}", disposition, percent_encode(name)),
    }
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}
