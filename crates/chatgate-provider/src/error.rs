//! Dispatch error types.

use chatgate_auth::AuthError;
use chatgate_core::{ConfigError, Provider};

/// Body text used when an error response could not be read.
pub const UNREADABLE_BODY: &str = "(failed to read error body)";

/// Every way a dispatch can fail.
///
/// None of these escape [`crate::Dispatcher::dispatch`]; they are rendered
/// into the `{error}` result there.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No provider, credentials or readable settings are available.
    #[error(transparent)]
    ConfigurationMissing(ConfigError),

    /// The configured provider key is not one of the supported backends.
    #[error("Unsupported API provider: {0}")]
    UnsupportedProvider(String),

    /// The backend answered with a non-success status.
    #[error("{} API error: {status}\n{body}", .provider.display_name())]
    UpstreamHttp {
        /// Backend that failed.
        provider: Provider,
        /// Numeric HTTP status.
        status: u16,
        /// Raw response text, or [`UNREADABLE_BODY`].
        body: String,
    },

    /// The backend answered successfully but without the expected field.
    #[error("Unexpected {} API response: {reason}", .provider.display_name())]
    MalformedResponse {
        /// Backend that answered.
        provider: Provider,
        /// What was missing or unparseable.
        reason: String,
    },

    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    /// The signed request could not be built.
    #[error("Request signing failed: {0}")]
    Signing(#[from] AuthError),
}

impl DispatchError {
    /// Short, stable name of the failure class, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing(_) => "configuration_missing",
            Self::UnsupportedProvider(_) => "unsupported_provider",
            Self::UpstreamHttp { .. } => "upstream_http",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Network(_) => "network",
            Self::Signing(_) => "signing",
        }
    }

    pub(crate) fn malformed(provider: Provider, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider,
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for DispatchError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnsupportedProvider(key) => Self::UnsupportedProvider(key),
            other => Self::ConfigurationMissing(other),
        }
    }
}

/// Errors from the caller-side request state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A request from this session has not finished yet.
    #[error("A request is already in flight")]
    AlreadyInFlight,
}
