//! Per-file comparison of an encrypted message against its decrypted
//! counterpart.
//!
//! Leaf payloads are expected to differ and are not compared byte for byte.
//! What must survive encryption is compared instead: headers, MIME types,
//! dispositions, filenames, transfer encodings, Content-Type parameters
//! (boundary excluded) and the shape of the tree.

use byok_core::defaults::HDR_DATAKEY;
use byok_crypto::is_wrapped_key_header;
use mailparse::{MailHeader, MailHeaderMap, ParsedMail};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

use crate::canon::{canon_param, canonical_header_map, canonical_params};
use crate::report::EmlDiff;

/// Compares message pairs.
#[derive(Debug, Clone, Default)]
pub struct EmlComparator {
    ignored_headers: BTreeSet<String>,
}

impl EmlComparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip these header names (case-insensitive) when comparing headers.
    pub fn with_ignored_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignored_headers
            .extend(names.into_iter().map(|n| n.as_ref().trim().to_lowercase()));
        self
    }

    pub fn ignored_headers(&self) -> &BTreeSet<String> {
        &self.ignored_headers
    }

    /// Compare two files. Read and parse failures become notes.
    pub fn compare(&self, filename: &str, encrypted: &Path, decrypted: &Path) -> EmlDiff {
        let mut diff = EmlDiff {
            filename: filename.to_string(),
            ..Default::default()
        };

        let (enc_raw, dec_raw) = match (std::fs::read(encrypted), std::fs::read(decrypted)) {
            (Ok(e), Ok(d)) => (e, d),
            (Err(e), _) | (_, Err(e)) => {
                diff.notes.push(format!("Failed to compare: read error: {}", e));
                return diff;
            }
        };
        self.compare_bytes(&mut diff, &enc_raw, &dec_raw);

        debug!(
            component = "compare",
            file = filename,
            header_differences = diff.header_differences.len(),
            structure_differences = diff.structure_differences.len(),
            notes = diff.notes.len(),
            "Compared message pair"
        );
        diff
    }

    /// Compare two raw messages into `diff`.
    pub fn compare_bytes(&self, diff: &mut EmlDiff, encrypted: &[u8], decrypted: &[u8]) {
        let parsed = mailparse::parse_mail(encrypted)
            .and_then(|enc| mailparse::parse_mail(decrypted).map(|dec| (enc, dec)));
        let (enc, dec) = match parsed {
            Ok(pair) => pair,
            Err(e) => {
                diff.notes.push(format!("Failed to compare: parse error: {}", e));
                return;
            }
        };

        match enc.headers.get_first_value(HDR_DATAKEY) {
            Some(value) if is_wrapped_key_header(&value) => {}
            Some(_) => diff
                .notes
                .push(format!("Encrypted file has a malformed {} header", HDR_DATAKEY)),
            None => diff
                .notes
                .push(format!("Encrypted file has no {} header", HDR_DATAKEY)),
        }

        self.compare_headers(&enc.headers, &dec.headers, &mut diff.header_differences);
        self.compare_structure(
            &enc,
            &dec,
            &mut diff.structure_differences,
            &mut diff.notes,
            "root",
        );
    }

    fn compare_headers(&self, a: &[MailHeader<'_>], b: &[MailHeader<'_>], out: &mut Vec<String>) {
        let a = canonical_header_map(a, &self.ignored_headers);
        let b = canonical_header_map(b, &self.ignored_headers);

        let names: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
        let empty = Vec::new();
        for name in names {
            let va = a.get(name).unwrap_or(&empty);
            let vb = b.get(name).unwrap_or(&empty);
            if va != vb {
                out.push(format!(
                    "Header differs: {}\n  encrypted: {}\n  decrypted: {}",
                    name,
                    list(va),
                    list(vb)
                ));
            }
        }
    }

    fn compare_structure(
        &self,
        a: &ParsedMail<'_>,
        b: &ParsedMail<'_>,
        out: &mut Vec<String>,
        notes: &mut Vec<String>,
        path: &str,
    ) {
        compare_meta(a, b, out, path);

        match (body_kind(a), body_kind(b)) {
            (BodyKind::Multipart, BodyKind::Multipart) => {
                if a.subparts.len() != b.subparts.len() {
                    out.push(format!(
                        "{}: multipart part count differs: encrypted={}, decrypted={}",
                        path,
                        a.subparts.len(),
                        b.subparts.len()
                    ));
                }
                for (i, (pa, pb)) in a.subparts.iter().zip(b.subparts.iter()).enumerate() {
                    self.compare_structure(pa, pb, out, notes, &format!("{}/part[{}]", path, i));
                }
            }
            (BodyKind::Message, BodyKind::Message) => {
                let embedded = (a.get_body_raw(), b.get_body_raw());
                let (ra, rb) = match embedded {
                    (Ok(ra), Ok(rb)) => (ra, rb),
                    (Err(e), _) | (_, Err(e)) => {
                        notes.push(format!("{}: embedded message unreadable: {}", path, e));
                        return;
                    }
                };
                match (mailparse::parse_mail(&ra), mailparse::parse_mail(&rb)) {
                    (Ok(ma), Ok(mb)) => {
                        self.compare_headers(&ma.headers, &mb.headers, out);
                        self.compare_structure(&ma, &mb, out, notes, &format!("{}/message", path));
                    }
                    (Err(e), _) | (_, Err(e)) => {
                        notes.push(format!("{}: embedded message unparsable: {}", path, e));
                    }
                }
            }
            (BodyKind::Leaf, BodyKind::Leaf) => {
                let size_a = body_size(a);
                let size_b = body_size(b);
                if let (Some(sa), Some(sb)) = (size_a, size_b) {
                    if (sa == 0) != (sb == 0) {
                        out.push(format!(
                            "{}: leaf body empty/non-empty mismatch (encrypted={}, decrypted={})",
                            path, sa, sb
                        ));
                    }
                }
            }
            (ka, kb) => out.push(format!(
                "{}: body kind differs: encrypted={}, decrypted={}",
                path,
                ka.as_str(),
                kb.as_str()
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Multipart,
    Message,
    Leaf,
}

impl BodyKind {
    fn as_str(self) -> &'static str {
        match self {
            BodyKind::Multipart => "multipart",
            BodyKind::Message => "message",
            BodyKind::Leaf => "leaf",
        }
    }
}

fn body_kind(mail: &ParsedMail<'_>) -> BodyKind {
    if mail.ctype.mimetype.starts_with("multipart/") && !mail.subparts.is_empty() {
        BodyKind::Multipart
    } else if mail.ctype.mimetype == "message/rfc822" {
        BodyKind::Message
    } else {
        BodyKind::Leaf
    }
}

/// Decoded body length, when it can be decoded.
fn body_size(mail: &ParsedMail<'_>) -> Option<usize> {
    mail.get_body_raw().ok().map(|b| b.len())
}

fn compare_meta(a: &ParsedMail<'_>, b: &ParsedMail<'_>, out: &mut Vec<String>, path: &str) {
    let mut check = |what: &str, va: String, vb: String| {
        if va != vb {
            out.push(format!(
                "{}: {} differs: encrypted={}, decrypted={}",
                path, what, va, vb
            ));
        }
    };

    check("mimeType", a.ctype.mimetype.to_lowercase(), b.ctype.mimetype.to_lowercase());
    check("disposition", disposition_type(a), disposition_type(b));
    check("filename param", filename(a), filename(b));
    check(
        "Content-Transfer-Encoding",
        header_param(a, "Content-Transfer-Encoding"),
        header_param(b, "Content-Transfer-Encoding"),
    );

    let pa = content_type_params(a);
    let pb = content_type_params(b);
    if pa != pb {
        out.push(format!(
            "{}: Content-Type params differ (boundary ignored)\n  encrypted: {}\n  decrypted: {}",
            path,
            map(&pa),
            map(&pb)
        ));
    }
}

fn disposition_type(mail: &ParsedMail<'_>) -> String {
    match mail.headers.get_first_value("Content-Disposition") {
        Some(value) => value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase(),
        None => String::new(),
    }
}

fn filename(mail: &ParsedMail<'_>) -> String {
    let disposition = mail.get_content_disposition();
    let name = disposition.params.get("filename").cloned().or_else(|| {
        mail.headers
            .get_first_value("Content-Type")
            .and_then(|v| mailparse::parse_content_type(&v).params.get("name").cloned())
    });
    name.map(|n| canon_param(&n)).unwrap_or_default()
}

fn header_param(mail: &ParsedMail<'_>, name: &str) -> String {
    mail.headers
        .get_first_value(name)
        .map(|v| canon_param(&v))
        .unwrap_or_default()
}

/// Parameters of the declared Content-Type without `boundary`. Empty when
/// no Content-Type header is present.
fn content_type_params(mail: &ParsedMail<'_>) -> BTreeMap<String, String> {
    let Some(value) = mail.headers.get_first_value("Content-Type") else {
        return BTreeMap::new();
    };
    let mut params = canonical_params(&mailparse::parse_content_type(&value).params);
    params.remove("boundary");
    params
}

fn list(values: &[String]) -> String {
    format!("[{}]", values.join(", "))
}

fn map(params: &BTreeMap<String, String>) -> String {
    let entries: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{{{}}}", entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECRYPTED: &[u8] = b"From: a@example.com\r\n\
Subject: hello\r\n\
Content-Type: multipart/mixed; boundary=\"one\"\r\n\
\r\n\
--one\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
aGk=\r\n\
--one\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=\"r.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERg==\r\n\
--one--\r\n";

    fn diff_of(comparator: &EmlComparator, enc: &[u8], dec: &[u8]) -> EmlDiff {
        let mut diff = EmlDiff::default();
        comparator.compare_bytes(&mut diff, enc, dec);
        diff
    }

    #[test]
    fn test_identical_messages_only_note_missing_key_header() {
        let diff = diff_of(&EmlComparator::new(), DECRYPTED, DECRYPTED);
        assert!(!diff.has_differences(), "{:?}", diff);
        assert_eq!(diff.notes.len(), 1);
        assert!(diff.notes[0].contains("X-TELEMESSAGE-ENC-DATAKEY"));
    }

    #[test]
    fn test_boundary_and_folding_ignored() {
        let reboundaried = String::from_utf8(DECRYPTED.to_vec())
            .unwrap()
            .replace("boundary=\"one\"", "boundary=\"two\"")
            .replace("--one", "--two")
            .replace("Subject: hello", "Subject:\r\n   hello");
        let comparator = EmlComparator::new().with_ignored_headers(["Content-Type"]);

        let diff = diff_of(&comparator, reboundaried.as_bytes(), DECRYPTED);
        assert!(!diff.has_differences(), "{:?}", diff);
    }

    #[test]
    fn test_header_difference_reported() {
        let changed = String::from_utf8(DECRYPTED.to_vec())
            .unwrap()
            .replace("Subject: hello", "Subject: goodbye");

        let diff = diff_of(&EmlComparator::new(), changed.as_bytes(), DECRYPTED);
        assert_eq!(diff.header_differences.len(), 1);
        assert!(diff.header_differences[0].starts_with("Header differs: subject\n"));
        assert!(diff.header_differences[0].contains("encrypted: [goodbye]"));
    }

    #[test]
    fn test_filename_and_count_differences() {
        let changed = String::from_utf8(DECRYPTED.to_vec())
            .unwrap()
            .replace("r.pdf", "other.pdf");
        let diff = diff_of(&EmlComparator::new(), changed.as_bytes(), DECRYPTED);
        assert!(diff
            .structure_differences
            .iter()
            .any(|d| d.starts_with("root/part[1]: filename param differs")));

        let single = b"From: a@example.com\r\nSubject: hello\r\n\
Content-Type: multipart/mixed; boundary=\"one\"\r\n\r\n\
--one\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Transfer-Encoding: base64\r\n\r\naGk=\r\n--one--\r\n";
        let diff = diff_of(&EmlComparator::new(), single, DECRYPTED);
        assert!(diff
            .structure_differences
            .iter()
            .any(|d| d.contains("multipart part count differs: encrypted=1, decrypted=2")));
    }

    #[test]
    fn test_body_kind_mismatch() {
        let leaf = b"From: a@example.com\r\nSubject: hello\r\nContent-Type: text/plain\r\n\r\nhi\r\n";
        let diff = diff_of(&EmlComparator::new(), leaf, DECRYPTED);
        assert!(diff
            .structure_differences
            .iter()
            .any(|d| d == "root: body kind differs: encrypted=leaf, decrypted=multipart"));
    }

    #[test]
    fn test_empty_leaf_mismatch() {
        let a = b"Content-Type: text/plain\r\n\r\n";
        let b = b"Content-Type: text/plain\r\n\r\nbody";
        let diff = diff_of(&EmlComparator::new(), a, b);
        assert!(diff
            .structure_differences
            .iter()
            .any(|d| d.contains("leaf body empty/non-empty mismatch (encrypted=0, decrypted=4)")));
    }

    #[test]
    fn test_unreadable_file_becomes_note() {
        let diff = EmlComparator::new().compare(
            "missing.eml",
            Path::new("/nonexistent/a.eml"),
            Path::new("/nonexistent/b.eml"),
        );
        assert_eq!(diff.filename, "missing.eml");
        assert!(!diff.has_differences());
        assert!(diff.notes[0].starts_with("Failed to compare"));
    }
}
