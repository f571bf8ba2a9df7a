//! [`Message`] to EML bytes.
//!
//! Output uses CRLF line endings. `Content-Type` is always recomputed from
//! the part (containers get their boundary parameter here) and
//! `Content-Length` is never written. Leaf bodies are encoded according to
//! the entity's `Content-Transfer-Encoding` header.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use byok_core::defaults::BASE64_LINE_LEN;
use uuid::Uuid;

use crate::model::{
    is_content_header, Container, HeaderList, Message, Part, CONTENT_TRANSFER_ENCODING,
    CONTENT_TYPE,
};

const CRLF: &[u8] = b"\r\n";

/// Longest quoted-printable line before the soft break.
const QP_LINE_LEN: usize = 75;

/// Fresh multipart boundary.
pub fn generate_boundary() -> String {
    format!("----=_Part_{}", Uuid::new_v4().simple())
}

/// `Content-Type` value written for a part.
///
/// For a container without an assigned boundary a fresh one is returned
/// alongside.
pub fn content_type_value(part: &Part) -> (String, Option<String>) {
    match part {
        Part::Leaf(leaf) => (leaf.content_type.clone(), None),
        Part::Container(container) => {
            let boundary = container.boundary.clone().unwrap_or_else(generate_boundary);
            (
                format!("multipart/{}; boundary=\"{}\"", container.subtype, boundary),
                Some(boundary),
            )
        }
    }
}

/// Serialize a message.
pub fn write_message(message: &Message) -> Vec<u8> {
    let mut out = Vec::new();
    write_entity(&mut out, &message.headers, &message.body);
    out
}

fn write_entity(out: &mut Vec<u8>, headers: &HeaderList, part: &Part) {
    let (content_type, boundary) = content_type_value(part);

    let mut wrote_content_type = false;
    for header in headers {
        if header.name.eq_ignore_ascii_case(CONTENT_TYPE) {
            if !wrote_content_type {
                write_header(out, CONTENT_TYPE, content_type.as_bytes());
                wrote_content_type = true;
            }
        } else if is_content_header(&header.name)
            && !header.name.eq_ignore_ascii_case(CONTENT_TRANSFER_ENCODING)
        {
            // Content-Length
        } else {
            write_header(out, &header.name, header.value_bytes());
        }
    }
    if !wrote_content_type {
        write_header(out, CONTENT_TYPE, content_type.as_bytes());
    }
    out.extend_from_slice(CRLF);

    match part {
        Part::Leaf(leaf) => {
            let encoding = headers
                .get(CONTENT_TRANSFER_ENCODING)
                .map(|v| v.trim().to_ascii_lowercase())
                .unwrap_or_default();
            match encoding.as_str() {
                "base64" => encode_base64(&leaf.payload, out),
                "quoted-printable" => encode_quoted_printable(&leaf.payload, out),
                _ => out.extend_from_slice(&leaf.payload),
            }
        }
        Part::Container(container) => {
            // content_type_value always yields a boundary for containers
            let boundary = boundary.unwrap_or_else(generate_boundary);
            write_children(out, container, &boundary);
        }
    }
}

fn write_children(out: &mut Vec<u8>, container: &Container, boundary: &str) {
    for child in &container.children {
        out.extend_from_slice(b"--");
        out.extend_from_slice(boundary.as_bytes());
        out.extend_from_slice(CRLF);
        write_entity(out, child.headers(), child);
        if !out.ends_with(CRLF) {
            out.extend_from_slice(CRLF);
        }
    }
    out.extend_from_slice(b"--");
    out.extend_from_slice(boundary.as_bytes());
    out.extend_from_slice(b"--");
    out.extend_from_slice(CRLF);
}

/// Write one header line. Value bytes pass through unchanged apart from
/// bare CR or LF, which become CRLF.
fn write_header(out: &mut Vec<u8>, name: &str, value: &[u8]) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    let mut i = 0;
    while i < value.len() {
        match value[i] {
            b'\r' => {
                out.extend_from_slice(CRLF);
                if value.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => out.extend_from_slice(CRLF),
            byte => out.push(byte),
        }
        i += 1;
    }
    out.extend_from_slice(CRLF);
}

/// Base64 with lines of at most 76 characters, each ending in CRLF.
fn encode_base64(data: &[u8], out: &mut Vec<u8>) {
    let encoded = STANDARD.encode(data);
    for line in encoded.as_bytes().chunks(BASE64_LINE_LEN) {
        out.extend_from_slice(line);
        out.extend_from_slice(CRLF);
    }
}

fn encode_quoted_printable(data: &[u8], out: &mut Vec<u8>) {
    let mut line_len = 0;
    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        if byte == b'\r' && data.get(i + 1) == Some(&b'\n') {
            out.extend_from_slice(CRLF);
            line_len = 0;
            i += 2;
            continue;
        }
        if byte == b'\n' {
            out.extend_from_slice(CRLF);
            line_len = 0;
            i += 1;
            continue;
        }

        let at_line_end = matches!(data.get(i + 1), None | Some(b'\r') | Some(b'\n'));
        let literal = ((byte == b' ' || byte == b'\t') && !at_line_end)
            || ((33..=126).contains(&byte) && byte != b'=');
        let width = if literal { 1 } else { 3 };

        if line_len + width > QP_LINE_LEN {
            out.extend_from_slice(b"=\r\n");
            line_len = 0;
        }
        if literal {
            out.push(byte);
        } else {
            out.extend_from_slice(format!("={:02X}", byte).as_bytes());
        }
        line_len += width;
        i += 1;
    }
}
