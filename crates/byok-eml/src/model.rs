//! In-memory MIME tree.
//!
//! A [`Message`] owns the top-level header list and one body [`Part`]. The
//! root part keeps its own header list empty: every top-level header,
//! including `Content-Type`, lives on the message. Nested parts carry their
//! headers themselves.

use byok_core::defaults::{CONTENT_HEADERS, DEFAULT_MULTIPART_SUBTYPE};
use mailparse::DispositionType;

/// Header name of the content disposition.
pub const CONTENT_DISPOSITION: &str = "Content-Disposition";

/// Header name of the transfer encoding.
pub const CONTENT_TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";

/// Header name of the content type.
pub const CONTENT_TYPE: &str = "Content-Type";

/// One header line. The value is kept as read, including folding.
///
/// Values that are not valid UTF-8 (8-bit Latin-1 subjects and the like)
/// keep their original bytes; the text form is then a lossy rendering used
/// for lookups, and the original bytes are what gets written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    value: String,
    raw: Option<Vec<u8>>,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            raw: None,
        }
    }

    /// Header from the bytes found in a message.
    pub fn from_bytes(name: impl Into<String>, value: &[u8]) -> Self {
        match std::str::from_utf8(value) {
            Ok(text) => Self::new(name, text),
            Err(_) => Self {
                name: name.into(),
                value: String::from_utf8_lossy(value).into_owned(),
                raw: Some(value.to_vec()),
            },
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Bytes written for the value.
    pub fn value_bytes(&self) -> &[u8] {
        self.raw.as_deref().unwrap_or(self.value.as_bytes())
    }

    fn replace_value(&mut self, value: String) {
        self.value = value;
        self.raw = None;
    }
}

/// Ordered header list with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    headers: Vec<Header>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, keeping any existing ones with the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push(Header::new(name, value));
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value())
    }

    /// All values for `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replace the first header named `name` in place and drop the rest.
    /// Appends when no such header exists.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter()
            .position(|h| h.name.eq_ignore_ascii_case(name))
        {
            Some(index) => {
                self.headers[index].replace_value(value);
                let mut seen = 0usize;
                self.headers.retain(|h| {
                    if h.name.eq_ignore_ascii_case(name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.push(name, value),
        }
    }

    /// Remove every header named `name`. Returns how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.headers.len();
        self.headers.retain(|h| !h.name.eq_ignore_ascii_case(name));
        before - self.headers.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.headers.iter()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Copy of this list without `Content-Type`, `Content-Transfer-Encoding`
    /// and `Content-Length`. Duplicates and order are kept.
    pub fn non_content(&self) -> HeaderList {
        self.headers
            .iter()
            .filter(|h| !is_content_header(&h.name))
            .cloned()
            .collect()
    }
}

impl FromIterator<Header> for HeaderList {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        Self {
            headers: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.iter()
    }
}

/// Whether `name` is one of the headers regenerated for every entity.
pub fn is_content_header(name: &str) -> bool {
    CONTENT_HEADERS.iter().any(|c| c.eq_ignore_ascii_case(name))
}

/// Single-part entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub headers: HeaderList,
    /// Full content-type value, parameters included.
    pub content_type: String,
    pub filename: Option<String>,
    /// Disposition type (`inline`, `attachment`, ...) when one was declared.
    pub disposition: Option<String>,
    /// Body after transfer decoding.
    pub payload: Vec<u8>,
}

/// Multipart entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub headers: HeaderList,
    /// Text after `multipart/`, e.g. `mixed` or `alternative`.
    pub subtype: String,
    /// Boundary used when writing. Assigned when the message is finalized.
    pub boundary: Option<String>,
    pub children: Vec<Part>,
}

impl Container {
    pub fn new(subtype: impl Into<String>, children: Vec<Part>) -> Self {
        Self {
            headers: HeaderList::new(),
            subtype: subtype.into(),
            boundary: None,
            children,
        }
    }
}

/// Node of the MIME tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Leaf(Leaf),
    Container(Container),
}

impl Part {
    pub fn headers(&self) -> &HeaderList {
        match self {
            Part::Leaf(leaf) => &leaf.headers,
            Part::Container(container) => &container.headers,
        }
    }

    pub fn headers_mut(&mut self) -> &mut HeaderList {
        match self {
            Part::Leaf(leaf) => &mut leaf.headers,
            Part::Container(container) => &mut container.headers,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Part::Container(_))
    }

    /// Number of leaves in this subtree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Part::Leaf(_) => 1,
            Part::Container(c) => c.children.iter().map(Part::leaf_count).sum(),
        }
    }

    /// Number of containers in this subtree, including this one.
    pub fn container_count(&self) -> usize {
        match self {
            Part::Leaf(_) => 0,
            Part::Container(c) => 1 + c.children.iter().map(Part::container_count).sum::<usize>(),
        }
    }
}

/// Parsed or rebuilt message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub headers: HeaderList,
    pub body: Part,
}

/// Subtype of a multipart content-type value.
///
/// Takes the text between the first `/` and the first `;` that follows it,
/// trimmed. Falls back to `mixed` when that text is empty or there is no `/`.
pub fn container_subtype(content_type: &str) -> String {
    let subtype = content_type.split_once('/').map(|(_, rest)| {
        let end = rest.find(';').unwrap_or(rest.len());
        rest[..end].trim()
    });

    match subtype {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => DEFAULT_MULTIPART_SUBTYPE.to_string(),
    }
}

/// Lowercase name of a parsed disposition type.
pub fn disposition_name(disposition: &DispositionType) -> String {
    match disposition {
        DispositionType::Inline => "inline".to_string(),
        DispositionType::Attachment => "attachment".to_string(),
        DispositionType::FormData => "form-data".to_string(),
        DispositionType::Extension(other) => other.to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_headers() -> HeaderList {
        let mut headers = HeaderList::new();
        headers.push("From", "alice@example.com");
        headers.push("Received", "from a");
        headers.push("Content-Type", "text/plain");
        headers.push("Received", "from b");
        headers.push("Content-Length", "42");
        headers.push("content-transfer-encoding", "7bit");
        headers
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let headers = sample_headers();
        assert_eq!(headers.get("from"), Some("alice@example.com"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(headers.get("Subject"), None);
    }

    #[test]
    fn test_get_all_keeps_order() {
        let headers = sample_headers();
        let received: Vec<_> = headers.get_all("received").collect();
        assert_eq!(received, vec!["from a", "from b"]);
    }

    #[test]
    fn test_set_replaces_in_place_and_dedups() {
        let mut headers = sample_headers();
        headers.set("RECEIVED", "only");

        let names: Vec<_> = headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names[1], "Received");
        assert_eq!(headers.get_all("Received").count(), 1);
        assert_eq!(headers.get("Received"), Some("only"));
    }

    #[test]
    fn test_set_appends_when_absent() {
        let mut headers = sample_headers();
        headers.set("MIME-Version", "1.0");
        assert_eq!(headers.iter().last().unwrap().name, "MIME-Version");
    }

    #[test]
    fn test_remove_counts() {
        let mut headers = sample_headers();
        assert_eq!(headers.remove("received"), 2);
        assert_eq!(headers.remove("received"), 0);
        assert_eq!(headers.len(), 4);
    }

    #[test]
    fn test_non_content_drops_structural_headers() {
        let copied = sample_headers().non_content();
        let names: Vec<_> = copied.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["From", "Received", "Received"]);
    }

    #[test]
    fn test_non_utf8_value_keeps_bytes() {
        let header = Header::from_bytes("Subject", b"caf\xe9");
        assert_eq!(header.value_bytes(), b"caf\xe9");
        assert!(header.value().starts_with("caf"));

        let mut headers: HeaderList = std::iter::once(header).collect();
        headers.set("subject", "plain");
        assert_eq!(headers.iter().next().unwrap().value_bytes(), b"plain");
    }

    #[test]
    fn test_utf8_value_is_text() {
        let header = Header::from_bytes("Subject", "caf\u{e9}".as_bytes());
        assert_eq!(header.value(), "caf\u{e9}");
        assert_eq!(header.value_bytes(), "caf\u{e9}".as_bytes());
    }

    #[test]
    fn test_container_subtype() {
        assert_eq!(container_subtype("multipart/alternative; boundary=\"x\""), "alternative");
        assert_eq!(container_subtype("multipart/related"), "related");
        assert_eq!(container_subtype("multipart/ mixed ;charset=x"), "mixed");
        assert_eq!(container_subtype("multipart/"), "mixed");
        assert_eq!(container_subtype("multipart/; boundary=x"), "mixed");
        assert_eq!(container_subtype("multipart"), "mixed");
    }

    #[test]
    fn test_counts() {
        let leaf = |name: &str| {
            Part::Leaf(Leaf {
                headers: HeaderList::new(),
                content_type: "text/plain".into(),
                filename: Some(name.into()),
                disposition: None,
                payload: Vec::new(),
            })
        };
        let inner = Part::Container(Container::new("alternative", vec![leaf("a"), leaf("b")]));
        let root = Part::Container(Container::new("mixed", vec![inner, leaf("c")]));

        assert_eq!(root.leaf_count(), 3);
        assert_eq!(root.container_count(), 2);
        assert!(root.is_container());
    }

    #[test]
    fn test_disposition_name() {
        assert_eq!(disposition_name(&DispositionType::Attachment), "attachment");
        assert_eq!(
            disposition_name(&DispositionType::Extension("X-Custom".into())),
            "x-custom"
        );
    }
}
