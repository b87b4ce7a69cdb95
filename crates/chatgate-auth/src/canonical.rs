//! Canonical request construction for AWS Signature Version 4.
//!
//! This module builds the canonical request that the signer hashes:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Outgoing requests never carry a query string, so the third line is always
//! empty. The canonical header block ends with its own newline, which yields
//! the blank line AWS expects between the headers and the signed-header list.

use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// The set of characters that must be percent-encoded in URI path segments.
///
/// Everything except the RFC 3986 unreserved characters
/// (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`) is encoded, including `! ' ( ) *`.
/// Forward slashes never reach the encoder because the path is split first.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The parts of a request URL the signer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Value of the `host` header: the host name, plus `:port` when the URL
    /// names a port explicitly.
    pub host: String,
    /// The raw path of the URL (`/` when empty).
    pub path: String,
}

impl RequestTarget {
    /// Parse a full request URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatgate_auth::canonical::RequestTarget;
    ///
    /// let target = RequestTarget::parse("https://api.example.com/model/m1/invoke").unwrap();
    /// assert_eq!(target.host, "api.example.com");
    /// assert_eq!(target.path, "/model/m1/invoke");
    /// ```
    pub fn parse(url: &str) -> Result<Self, AuthError> {
        let uri: http::Uri = url
            .parse()
            .map_err(|_| AuthError::InvalidUrl(url.to_owned()))?;

        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AuthError::MissingHost(url.to_owned()))?;

        let host = match uri.port_u16() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };

        let path = match uri.path() {
            "" => "/".to_owned(),
            p => p.to_owned(),
        };

        Ok(Self { host, path })
    }
}

/// A fully canonicalized request, ready to be hashed into the string to sign.
///
/// Exists only for the duration of one signing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// Upper-case HTTP method.
    pub method: String,
    /// Percent-encoded path.
    pub canonical_uri: String,
    /// Sorted `name:value` lines, each terminated by a newline.
    pub canonical_headers: String,
    /// Semicolon-separated lowercase header names, sorted.
    pub signed_headers: String,
    /// Lowercase hex SHA-256 of the body.
    pub payload_hash: String,
}

impl CanonicalRequest {
    /// Canonicalize a request against an already parsed path.
    ///
    /// Every header passed in is signed.
    #[must_use]
    pub fn new(method: &str, path: &str, headers: &[(&str, &str)], body: &[u8]) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            canonical_uri: build_canonical_uri(path),
            canonical_headers: build_canonical_headers(headers),
            signed_headers: build_signed_headers_string(headers),
            payload_hash: hash_payload(body),
        }
    }

    /// Canonicalize a request given its full URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatgate_auth::canonical::CanonicalRequest;
    ///
    /// let canonical = CanonicalRequest::from_url(
    ///     "POST",
    ///     "https://example.com/model/a:b/invoke",
    ///     &[("Host", "example.com")],
    ///     b"",
    /// )
    /// .unwrap();
    /// assert_eq!(canonical.canonical_uri, "/model/a%3Ab/invoke");
    /// assert_eq!(canonical.signed_headers, "host");
    /// ```
    pub fn from_url(
        method: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<Self, AuthError> {
        let target = RequestTarget::parse(url)?;
        Ok(Self::new(method, &target.path, headers, body))
    }

    /// Lowercase hex SHA-256 of the canonical request string.
    #[must_use]
    pub fn hash(&self) -> String {
        hash_payload(self.to_string().as_bytes())
    }
}

impl fmt::Display for CanonicalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n\n{}\n{}\n{}",
            self.method,
            self.canonical_uri,
            self.canonical_headers,
            self.signed_headers,
            self.payload_hash
        )
    }
}

/// Build the canonical URI by percent-encoding each path segment individually.
///
/// Forward slashes are preserved and empty segments stay empty. The path is
/// encoded exactly as given; existing `%` escapes are encoded again.
///
/// # Examples
///
/// ```
/// use chatgate_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/model/x:1/invoke"), "/model/x%3A1/invoke");
/// assert_eq!(build_canonical_uri("/"), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            if segment.is_empty() {
                String::new()
            } else {
                uri_encode(segment)
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical header block.
///
/// Header names are lowercased, values are trimmed and inner whitespace runs
/// collapsed to one space. Lines are sorted by name and each is followed by a
/// newline, so the block always ends with `\n`. Repeated names are merged with
/// commas in input order.
///
/// # Examples
///
/// ```
/// use chatgate_auth::canonical::build_canonical_headers;
///
/// let block = build_canonical_headers(&[("X-Amz-Date", "20130524T000000Z"), ("Host", "example.com")]);
/// assert_eq!(block, "host:example.com\nx-amz-date:20130524T000000Z\n");
/// ```
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)]) -> String {
    collect_headers(headers)
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect()
}

/// Build the signed headers string as a semicolon-separated list of lowercase
/// header names, in the same order as the canonical header block.
///
/// # Examples
///
/// ```
/// use chatgate_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(
///     build_signed_headers_string(&[("X-Amz-Date", "x"), ("Host", "h")]),
///     "host;x-amz-date"
/// );
/// ```
#[must_use]
pub fn build_signed_headers_string(headers: &[(&str, &str)]) -> String {
    collect_headers(headers)
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";")
}

/// Compute the SHA-256 hash of the given payload and return it as a lowercase hex string.
///
/// # Examples
///
/// ```
/// use chatgate_auth::canonical::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Collect headers into a map sorted by lowercase name.
fn collect_headers(headers: &[(&str, &str)]) -> BTreeMap<String, String> {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }
    header_map
}

/// URI-encode a single path segment using the SigV4 encoding rules.
fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Collapse consecutive whitespace characters in a string to a single space.
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

#[cfg(test)]
mod tests {
    use super::*;

    const BEDROCK_URL: &str = "https://bedrock-runtime.us-east-1.amazonaws.com/model/us.anthropic.claude-sonnet-4-20250514-v1:0/invoke";

    #[test]
    fn test_should_build_canonical_uri_for_simple_path() {
        assert_eq!(build_canonical_uri("/test.txt"), "/test.txt");
    }

    #[test]
    fn test_should_normalize_empty_path_to_slash() {
        assert_eq!(build_canonical_uri(""), "/");
        assert_eq!(build_canonical_uri("/"), "/");
    }

    #[test]
    fn test_should_encode_special_characters_in_path() {
        assert_eq!(build_canonical_uri("/hello world"), "/hello%20world");
    }

    #[test]
    fn test_should_escape_reserved_sub_delimiters_as_uppercase_hex() {
        assert_eq!(build_canonical_uri("/a!b'c(d)e*f"), "/a%21b%27c%28d%29e%2Af");
    }

    #[test]
    fn test_should_keep_unreserved_characters() {
        assert_eq!(build_canonical_uri("/a-b_c.d~e"), "/a-b_c.d~e");
    }

    #[test]
    fn test_should_encode_each_segment_independently() {
        assert_eq!(
            build_canonical_uri("/model/us.anthropic.claude-opus-4-20250514-v1:0/invoke"),
            "/model/us.anthropic.claude-opus-4-20250514-v1%3A0/invoke"
        );
    }

    #[test]
    fn test_should_preserve_empty_segments_and_trailing_slash() {
        assert_eq!(build_canonical_uri("/a//b/"), "/a//b/");
    }

    #[test]
    fn test_should_encode_existing_percent_escapes_again() {
        assert_eq!(build_canonical_uri("/hello%20world"), "/hello%2520world");
    }

    #[test]
    fn test_should_encode_non_ascii_as_utf8_bytes() {
        assert_eq!(build_canonical_uri("/caf\u{e9}"), "/caf%C3%A9");
    }

    #[test]
    fn test_should_build_canonical_headers_sorted_and_lowercased() {
        let headers = [
            ("X-Amz-Security-Token", "token"),
            ("Host", "bedrock-runtime.us-east-1.amazonaws.com"),
            ("X-Amz-Date", "20250514T083000Z"),
        ];
        let expected = "host:bedrock-runtime.us-east-1.amazonaws.com\n\
                        x-amz-date:20250514T083000Z\n\
                        x-amz-security-token:token\n";
        assert_eq!(build_canonical_headers(&headers), expected);
    }

    #[test]
    fn test_should_canonicalize_headers_independent_of_input_order() {
        let a = build_canonical_headers(&[("X-Amz-Date", "20250514T083000Z"), ("Host", "h")]);
        let b = build_canonical_headers(&[("Host", "h"), ("X-Amz-Date", "20250514T083000Z")]);
        assert_eq!(a, b);
        assert_eq!(
            build_signed_headers_string(&[("X-Amz-Date", "d"), ("Host", "h")]),
            build_signed_headers_string(&[("Host", "h"), ("X-Amz-Date", "d")])
        );
    }

    #[test]
    fn test_should_collapse_whitespace_in_header_values() {
        let headers = [("Host", "  example.com  "), ("X-Custom", "a   b   c")];
        assert_eq!(
            build_canonical_headers(&headers),
            "host:example.com\nx-custom:a b c\n"
        );
    }

    #[test]
    fn test_should_build_signed_headers_string_sorted() {
        assert_eq!(
            build_signed_headers_string(&[("x-amz-date", ""), ("host", ""), ("range", "")]),
            "host;range;x-amz-date"
        );
    }

    #[test]
    fn test_should_parse_target_host_and_path() {
        let target = RequestTarget::parse(BEDROCK_URL).unwrap();
        assert_eq!(target.host, "bedrock-runtime.us-east-1.amazonaws.com");
        assert_eq!(
            target.path,
            "/model/us.anthropic.claude-sonnet-4-20250514-v1:0/invoke"
        );
    }

    #[test]
    fn test_should_keep_explicit_port_in_host() {
        let target = RequestTarget::parse("http://localhost:4566/model/m/invoke").unwrap();
        assert_eq!(target.host, "localhost:4566");
    }

    #[test]
    fn test_should_reject_unparseable_url() {
        let result = RequestTarget::parse("https://exa mple.com/");
        assert!(matches!(result, Err(AuthError::InvalidUrl(_))));
    }

    #[test]
    fn test_should_reject_url_without_host() {
        let result = RequestTarget::parse("/model/m/invoke");
        assert!(matches!(result, Err(AuthError::MissingHost(_))));
    }

    #[test]
    fn test_should_embed_body_hash_in_canonical_request() {
        let bodies: [&[u8]; 4] = [b"", b"{}", b"{\"messages\":[]}", &[0xff, 0x00, 0x10]];
        for body in bodies {
            let canonical = CanonicalRequest::from_url("POST", BEDROCK_URL, &[], body).unwrap();
            assert_eq!(canonical.payload_hash, hex::encode(Sha256::digest(body)));
            assert!(canonical.to_string().ends_with(&canonical.payload_hash));
        }
    }

    #[test]
    fn test_should_build_canonical_request_for_bedrock_invoke() {
        let headers = [
            ("host", "bedrock-runtime.us-east-1.amazonaws.com"),
            ("x-amz-date", "20250514T083000Z"),
        ];
        let canonical =
            CanonicalRequest::from_url("POST", BEDROCK_URL, &headers, b"{\"messages\":[]}")
                .unwrap();

        let expected = "POST\n\
                        /model/us.anthropic.claude-sonnet-4-20250514-v1%3A0/invoke\n\
                        \n\
                        host:bedrock-runtime.us-east-1.amazonaws.com\n\
                        x-amz-date:20250514T083000Z\n\
                        \n\
                        host;x-amz-date\n\
                        5e4ce7b36ba37b78a5d5f9fd08e6b7b54ba6879d651aa46ec9e1d6fa24ebe30a";
        assert_eq!(canonical.to_string(), expected);
        assert_eq!(
            canonical.hash(),
            "f958c07667a0e47b3c4d2e83d029b178af9bd890e3921e0a350b3ad5d8abbc5c"
        );
    }

    #[test]
    fn test_should_match_aws_get_object_canonical_hash() {
        let headers = [
            ("host", "examplebucket.s3.amazonaws.com"),
            ("range", "bytes=0-9"),
            (
                "x-amz-content-sha256",
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            ),
            ("x-amz-date", "20130524T000000Z"),
        ];
        let canonical = CanonicalRequest::new("GET", "/test.txt", &headers, b"");
        assert_eq!(
            canonical.hash(),
            "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972"
        );
    }
}
