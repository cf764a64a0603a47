//! Canonical request construction for AWS Signature Version 4.
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! The beacon only ever signs requests without a query string, so the third
//! line is always empty. Every header handed to the builder is signed: the
//! canonical header block and the signed-header list are derived from the
//! same sorted set, which keeps them in lockstep.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::sigv4::hash_payload;

/// Characters left unescaped in a path segment: `A-Z a-z 0-9 - _ . ~`.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the canonical request for a request with an empty query string.
///
/// `headers` may use any casing and order; they are lower-cased and sorted.
/// The payload is hashed as-is, so it must be the exact body that goes on
/// the wire.
///
/// # Examples
///
/// ```
/// use beacon_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "POST",
///     "/",
///     &[("Host", "kinesis.us-east-1.amazonaws.com"), ("X-Amz-Date", "20240101T000000Z")],
///     b"",
/// );
/// assert!(canonical.starts_with("POST\n/\n\nhost:kinesis.us-east-1.amazonaws.com\n"));
/// assert!(canonical.ends_with("\n\nhost;x-amz-date\ne3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    payload: &[u8],
) -> String {
    let canonical_uri = build_canonical_uri(path);
    let header_map = normalize_headers(headers);
    let canonical_headers = header_map
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join("\n");
    let signed_headers = header_map
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";");
    let payload_hash = hash_payload(payload);

    format!("{method}\n{canonical_uri}\n\n{canonical_headers}\n\n{signed_headers}\n{payload_hash}")
}

/// Build the semicolon-separated list of signed header names.
///
/// Produces exactly the list embedded in [`build_canonical_request`] for the
/// same `headers`.
///
/// # Examples
///
/// ```
/// use beacon_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(
///     build_signed_headers_string(&[("X-Amz-Target", "t"), ("Host", "h"), ("Content-Type", "c")]),
///     "content-type;host;x-amz-target"
/// );
/// ```
#[must_use]
pub fn build_signed_headers_string(headers: &[(&str, &str)]) -> String {
    normalize_headers(headers)
        .into_keys()
        .collect::<Vec<_>>()
        .join(";")
}

/// Build the canonical URI by percent-encoding each path segment.
///
/// Forward slashes are preserved and an empty path becomes `/`. Segments are
/// decoded before encoding so an already-encoded path is not double-encoded.
///
/// # Examples
///
/// ```
/// use beacon_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri(""), "/");
/// assert_eq!(build_canonical_uri("/"), "/");
/// assert_eq!(build_canonical_uri("/a b"), "/a%20b");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            utf8_percent_encode(&decoded, URI_ENCODE_SET).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Lower-case names, trim and collapse values, merge duplicates with `,`.
fn normalize_headers(headers: &[(&str, &str)]) -> BTreeMap<String, String> {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = collapse_whitespace(value.trim());
        header_map
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    header_map
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
