//! EML bytes to [`Message`].
//!
//! Parsing goes through `mailparse`. Header values are copied raw so that
//! folding and encoded words survive a rewrite unchanged; payloads are
//! stored after transfer decoding.

use byok_core::defaults::DEFAULT_CONTENT_TYPE;
use mailparse::{MailHeader, ParsedMail};
use tracing::trace;

use crate::error::{EmlError, EmlResult};
use crate::model::{
    container_subtype, disposition_name, Container, Header, HeaderList, Leaf, Message, Part,
    CONTENT_DISPOSITION, CONTENT_TYPE,
};

/// Parse a complete message.
///
/// # Errors
///
/// - `Parse` if the bytes are not a MIME message or a body cannot be
///   transfer-decoded
/// - `MissingBoundary` if a multipart entity declares no boundary
pub fn parse_message(raw: &[u8]) -> EmlResult<Message> {
    let mail = mailparse::parse_mail(raw)?;
    let headers = collect_headers(&mail.headers);
    let body = build_part(&mail, &headers, HeaderList::new())?;
    Ok(Message { headers, body })
}

/// Build one part. `source` holds the headers describing the entity, which
/// for the root are the message headers; `own` is what the part keeps.
fn build_part(mail: &ParsedMail<'_>, source: &HeaderList, own: HeaderList) -> EmlResult<Part> {
    let content_type = source
        .get(CONTENT_TYPE)
        .map(|v| unfold(v).trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    if mail.ctype.mimetype.starts_with("multipart/") {
        if !mail.ctype.params.contains_key("boundary") {
            return Err(EmlError::MissingBoundary(content_type));
        }
        if mail.subparts.is_empty() {
            return Err(EmlError::Parse(format!(
                "multipart entity has no body parts: {}",
                content_type
            )));
        }

        let mut children = Vec::with_capacity(mail.subparts.len());
        for sub in &mail.subparts {
            let sub_headers = collect_headers(&sub.headers);
            children.push(build_part(sub, &sub_headers, sub_headers.clone())?);
        }

        trace!(
            subtype = %container_subtype(&content_type),
            children = children.len(),
            "Parsed container"
        );

        return Ok(Part::Container(Container {
            headers: own,
            subtype: container_subtype(&content_type),
            boundary: mail.ctype.params.get("boundary").cloned(),
            children,
        }));
    }

    let disposition = source
        .contains(CONTENT_DISPOSITION)
        .then(|| disposition_name(&mail.get_content_disposition().disposition));
    let filename = mail
        .get_content_disposition()
        .params
        .get("filename")
        .or_else(|| mail.ctype.params.get("name"))
        .cloned();

    Ok(Part::Leaf(Leaf {
        headers: own,
        content_type,
        filename,
        disposition,
        payload: mail.get_body_raw()?,
    }))
}

fn collect_headers(headers: &[MailHeader<'_>]) -> HeaderList {
    headers
        .iter()
        .map(|h| {
            let raw = h.get_value_raw();
            let end = raw
                .iter()
                .rposition(|b| !matches!(b, b'\r' | b'\n'))
                .map_or(0, |i| i + 1);
            Header::from_bytes(h.get_key(), &raw[..end])
        })
        .collect()
}

/// Join folded header lines.
fn unfold(value: &str) -> String {
    value.replace("\r\n", "").replace('\n', "")
}
