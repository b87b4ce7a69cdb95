//! AWS Signature Version 4 signing.
//!
//! This module implements the client side of SigV4 for a single request:
//!
//! 1. Capture the timestamp once and derive the `x-amz-date` value and date stamp.
//! 2. Canonicalize the request over `host`, `x-amz-date` and, when a session
//!    token is present, `x-amz-security-token`.
//! 3. Build the string to sign from the timestamp, credential scope, and canonical request hash.
//! 4. Derive the signing key using an HMAC-SHA256 chain over the credential scope components.
//! 5. Compute the signature and assemble the `Authorization` header value.
//!
//! The main entry point is [`sign_request`]. Every artifact it creates lives
//! only for the duration of the call.

use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::canonical::{CanonicalRequest, RequestTarget};
use crate::error::AuthError;

/// The only algorithm this implementation produces.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Header carrying the request timestamp.
pub const AMZ_DATE_HEADER: &str = "x-amz-date";

/// Header carrying a temporary-credential session token.
pub const SECURITY_TOKEN_HEADER: &str = "x-amz-security-token";

/// Terminator of every credential scope.
const SCOPE_TERMINATOR: &str = "aws4_request";

/// `chrono` format for the compact ISO-8601 timestamp (`YYYYMMDDTHHMMSSZ`).
const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

type HmacSha256 = Hmac<Sha256>;

/// Long-lived AWS credentials used to sign one request.
#[derive(Clone)]
pub struct SigningCredentials {
    /// The access key ID placed in the credential scope.
    pub access_key_id: String,
    /// The secret access key. Never leaves this crate except as derived HMAC output.
    pub secret_access_key: String,
    /// Optional session token for temporary credentials.
    pub session_token: Option<String>,
}

impl SigningCredentials {
    /// Create credentials, treating an empty session token as absent.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.filter(|t| !t.is_empty()),
        }
    }
}

impl fmt::Debug for SigningCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Everything about the request being signed, with its timestamp fixed.
#[derive(Debug, Clone)]
pub struct SigningContext<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// Full request URL.
    pub url: &'a str,
    /// Exact body bytes that will be sent.
    pub body: &'a [u8],
    /// AWS region of the endpoint.
    pub region: &'a str,
    /// AWS service name used in the credential scope.
    pub service: &'a str,
    /// Signing time, read once from the wall clock.
    pub timestamp: DateTime<Utc>,
}

impl<'a> SigningContext<'a> {
    /// Create a context stamped with the current time.
    #[must_use]
    pub fn new(
        method: &'a str,
        url: &'a str,
        body: &'a [u8],
        region: &'a str,
        service: &'a str,
    ) -> Self {
        Self {
            method,
            url,
            body,
            region,
            service,
            timestamp: Utc::now(),
        }
    }

    /// Replace the signing time.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Headers produced by signing a request.
///
/// All of them must be sent unchanged; `host`, `x-amz-date` and the optional
/// security token are part of the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// The `Authorization` header value.
    pub authorization: String,
    /// The `host` header value that was signed.
    pub host: String,
    /// The `x-amz-date` header value (`YYYYMMDDTHHMMSSZ`).
    pub amz_date: String,
    /// The `x-amz-security-token` header value, if temporary credentials were used.
    pub security_token: Option<String>,
    /// Semicolon-separated names of the signed headers.
    pub signed_headers: String,
}

impl SignedHeaders {
    /// The headers to attach to the outgoing request, as `(name, value)` pairs.
    ///
    /// Every name listed in [`SignedHeaders::signed_headers`] appears here.
    #[must_use]
    pub fn header_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("host", self.host.clone()),
            (AMZ_DATE_HEADER, self.amz_date.clone()),
        ];
        if let Some(token) = &self.security_token {
            pairs.push((SECURITY_TOKEN_HEADER, token.clone()));
        }
        pairs.push(("authorization", self.authorization.clone()));
        pairs
    }
}

/// Sign a request with SigV4 and return the headers to send.
///
/// The timestamp in `ctx` is used for both the `x-amz-date` header and the
/// string to sign.
///
/// # Errors
///
/// Returns an [`AuthError`] if the URL cannot be parsed or has no host.
///
/// # Examples
///
/// ```
/// use chatgate_auth::sigv4::{SigningContext, SigningCredentials, sign_request};
///
/// let credentials = SigningCredentials::new("AKIDEXAMPLE", "secret", None);
/// let ctx = SigningContext::new(
///     "POST",
///     "https://bedrock-runtime.us-east-1.amazonaws.com/model/m/invoke",
///     b"{}",
///     "us-east-1",
///     "bedrock",
/// );
/// let signed = sign_request(&ctx, &credentials).unwrap();
/// assert!(signed.authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
/// assert_eq!(signed.signed_headers, "host;x-amz-date");
/// ```
pub fn sign_request(
    ctx: &SigningContext<'_>,
    credentials: &SigningCredentials,
) -> Result<SignedHeaders, AuthError> {
    let target = RequestTarget::parse(ctx.url)?;

    let amz_date = format_amz_date(&ctx.timestamp);
    let date = &amz_date[..8];

    let mut headers = vec![("host", target.host.as_str()), (AMZ_DATE_HEADER, amz_date.as_str())];
    if let Some(token) = &credentials.session_token {
        headers.push((SECURITY_TOKEN_HEADER, token.as_str()));
    }

    let canonical_request = CanonicalRequest::new(ctx.method, &target.path, &headers, ctx.body);
    debug!(
        method = %canonical_request.method,
        canonical_uri = %canonical_request.canonical_uri,
        signed_headers = %canonical_request.signed_headers,
        payload_hash = %canonical_request.payload_hash,
        "Built canonical request"
    );

    let credential_scope = build_credential_scope(date, ctx.region, ctx.service);
    let string_to_sign =
        build_string_to_sign(&amz_date, &credential_scope, &canonical_request.hash());
    debug!(string_to_sign, "Built string to sign");

    let signing_key = derive_signing_key(
        &credentials.secret_access_key,
        date,
        ctx.region,
        ctx.service,
    );
    let signature = compute_signature(&signing_key, &string_to_sign);

    let authorization = build_authorization_header(
        &credentials.access_key_id,
        &credential_scope,
        &canonical_request.signed_headers,
        &signature,
    );

    debug!(
        access_key_id = %credentials.access_key_id,
        region = ctx.region,
        service = ctx.service,
        signed_headers = %canonical_request.signed_headers,
        "Signed request"
    );

    Ok(SignedHeaders {
        authorization,
        host: target.host,
        amz_date,
        security_token: credentials.session_token.clone(),
        signed_headers: canonical_request.signed_headers,
    })
}

/// Format a timestamp as the compact ISO-8601 `x-amz-date` value.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use chatgate_auth::sigv4::format_amz_date;
///
/// let ts = Utc.with_ymd_and_hms(2013, 5, 24, 0, 0, 0).unwrap();
/// assert_eq!(format_amz_date(&ts), "20130524T000000Z");
/// ```
#[must_use]
pub fn format_amz_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(AMZ_DATE_FORMAT).to_string()
}

/// Build the credential scope `date/region/service/aws4_request`.
#[must_use]
pub fn build_credential_scope(date: &str, region: &str, service: &str) -> String {
    format!("{date}/{region}/{service}/{SCOPE_TERMINATOR}")
}

/// Build the SigV4 string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use chatgate_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
///
/// Each link keys the next with the raw bytes of the previous result.
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Compute the HMAC-SHA256 signature of `data` using the given `signing_key`.
///
/// Returns the lowercase hex-encoded signature.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Assemble the `Authorization` header value.
#[must_use]
pub fn build_authorization_header(
    access_key_id: &str,
    credential_scope: &str,
    signed_headers: &str,
    signature: &str,
) -> String {
    format!(
        "{ALGORITHM} Credential={access_key_id}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}"
    )
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
