//! Centralized constants for the BYOK EML encrypter.
//!
//! Header names and the message file extension are part of the on-disk
//! contract with downstream archival tooling. Do not change them.

// =============================================================================
// MESSAGE HEADERS
// =============================================================================

/// Header carrying the wrapped content key (`V2.0#: <base64>`).
pub const HDR_DATAKEY: &str = "X-TELEMESSAGE-ENC-DATAKEY";

/// Header carrying the configured integrity pass-through value.
///
/// The misspelling is part of the wire contract.
pub const HDR_INTEGRITY: &str = "X-TELEMESSAGE-OriginalMesageIntegrity";

/// Header carrying the configured key identifier.
pub const HDR_KEY_ID: &str = "X-TELEMESSAGE-ENC-KEY-ID";

/// Content headers that are recomputed when a part is rebuilt.
pub const CONTENT_HEADERS: [&str; 3] = [
    "Content-Type",
    "Content-Transfer-Encoding",
    "Content-Length",
];

// =============================================================================
// FILES
// =============================================================================

/// Extension (without dot) of message files picked up by the batch run.
pub const MESSAGE_EXTENSION: &str = "eml";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "BYOK_CONFIG";

// =============================================================================
// MIME
// =============================================================================

/// Container subtype used when a multipart Content-Type cannot be parsed.
pub const DEFAULT_MULTIPART_SUBTYPE: &str = "mixed";

/// Content type assumed for entities without a Content-Type header.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Transfer encoding forced onto every encrypted leaf.
pub const ENCRYPTED_TRANSFER_ENCODING: &str = "base64";

/// Maximum encoded line length for base64 bodies (RFC 2045).
pub const BASE64_LINE_LEN: usize = 76;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names_are_stable() {
        assert_eq!(HDR_DATAKEY, "X-TELEMESSAGE-ENC-DATAKEY");
        assert_eq!(HDR_INTEGRITY, "X-TELEMESSAGE-OriginalMesageIntegrity");
        assert_eq!(HDR_KEY_ID, "X-TELEMESSAGE-ENC-KEY-ID");
    }

    #[test]
    fn test_content_headers_exclude_disposition() {
        assert!(!CONTENT_HEADERS
            .iter()
            .any(|h| h.eq_ignore_ascii_case("Content-Disposition")));
    }
}
