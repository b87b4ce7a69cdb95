//! Error types for the ChatGate core.

use crate::types::Provider;

/// Failure to read or write the persisted settings store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("settings store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored data is not a JSON object, or a value could not be encoded.
    #[error("settings store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration problems detected while loading or validating settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No provider or no credentials have been configured at all.
    #[error("API not configured. Please configure API settings first.")]
    NotConfigured,

    /// The configured provider key is not one this engine knows.
    #[error("Unsupported API provider: {0}")]
    UnsupportedProvider(String),

    /// The provider is configured but its required credentials are incomplete.
    #[error("{}", missing_credentials_message(.0))]
    MissingCredentials(Provider),

    /// A field required before settings can be saved is empty.
    #[error("{provider} setting `{field}` is required")]
    MissingField {
        /// Provider whose form is incomplete.
        provider: Provider,
        /// Persisted key of the missing field.
        field: &'static str,
    },

    /// The persisted settings do not have the expected shape.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The settings store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn missing_credentials_message(provider: &Provider) -> String {
    match provider {
        Provider::Bedrock => "AWS credentials are required for Bedrock API".to_owned(),
        other => format!("{} API key is required", other.display_name()),
    }
}

/// Convenience result type for ChatGate core operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
