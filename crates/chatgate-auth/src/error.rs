//! Error types for SigV4 request signing.

/// Errors that can occur while signing an outgoing request.
///
/// Signing is a pure computation over its inputs, so the only failure mode is
/// a target URL that cannot be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request URL could not be parsed.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// The request URL has no host component to sign.
    #[error("Request URL has no host: {0}")]
    MissingHost(String),
}
