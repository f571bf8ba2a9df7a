//! Canonical forms used when comparing headers and parameters.
//!
//! Line endings, folding and runs of blanks are not meaningful differences;
//! everything else is.

use mailparse::MailHeader;
use std::collections::{BTreeMap, BTreeSet};

/// Unfold a header value and compress blanks.
pub fn canon_header_value(value: &str) -> String {
    let normalized = value.replace("\r\n", "\n").replace('\r', "\n");

    let mut unfolded = String::with_capacity(normalized.len());
    let mut lines = normalized.split('\n');
    if let Some(first) = lines.next() {
        unfolded.push_str(first);
    }
    for line in lines {
        if line.starts_with([' ', '\t']) {
            unfolded.push(' ');
            unfolded.push_str(line.trim_start_matches([' ', '\t']));
        } else {
            unfolded.push('\n');
            unfolded.push_str(line);
        }
    }

    compress_blanks(&unfolded).trim().to_string()
}

/// Trim a parameter value and compress blanks.
pub fn canon_param(value: &str) -> String {
    let normalized = value.replace("\r\n", "\n").replace('\r', "\n");
    compress_blanks(normalized.trim())
}

/// Header values grouped by lowercase name, in order of appearance.
pub fn canonical_header_map(
    headers: &[MailHeader<'_>],
    ignored: &BTreeSet<String>,
) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for header in headers {
        let name = header.get_key().trim().to_lowercase();
        if name.is_empty() || ignored.contains(&name) {
            continue;
        }
        let value = String::from_utf8_lossy(header.get_value_raw());
        map.entry(name).or_default().push(canon_header_value(&value));
    }
    map
}

/// Content-Type parameters with lowercase names and canonical values.
pub fn canonical_params(params: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    params
        .iter()
        .map(|(k, v)| (k.trim().to_lowercase(), canon_param(v)))
        .collect()
}

fn compress_blanks(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_blank = false;
    for c in value.chars() {
        if c == ' ' || c == '\t' {
            if !in_blank {
                out.push(' ');
            }
            in_blank = true;
        } else {
            out.push(c);
            in_blank = false;
        }
    }
    out
}
