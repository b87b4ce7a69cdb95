//! Persisted user settings.
//!
//! The settings object is stored as a flat set of JSON values under camelCase
//! keys (`apiProvider`, `apiKeys`, `selectedModel`, ...). [`Settings`] is the
//! typed view over those keys. It is rebuilt from the store on every dispatch
//! so rotated credentials take effect on the next call.

use std::fmt;

use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::store::SettingsMap;
use crate::types::{Credentials, Provider};

/// Persisted key names.
pub mod keys {
    /// Selected provider key (`bedrock`, `openai`, `anthropic`).
    pub const API_PROVIDER: &str = "apiProvider";
    /// Credentials object for all providers.
    pub const API_KEYS: &str = "apiKeys";
    /// Model identifier chosen for the selected provider.
    pub const SELECTED_MODEL: &str = "selectedModel";
    /// Whether the signed provider should use a private endpoint.
    pub const USE_CUSTOM_VPC_ENDPOINT: &str = "useCustomVpcEndpoint";
    /// Base URL of the private endpoint.
    pub const VPC_ENDPOINT_URL: &str = "vpcEndpointUrl";
    /// Whether the Anthropic provider should use a custom base URL.
    pub const USE_CUSTOM_BASE_URL: &str = "useCustomBaseUrl";
    /// Custom Anthropic base URL.
    pub const CUSTOM_BASE_URL: &str = "customBaseUrl";

    /// Every key the engine reads.
    pub const ALL: &[&str] = &[
        API_PROVIDER,
        API_KEYS,
        SELECTED_MODEL,
        USE_CUSTOM_VPC_ENDPOINT,
        VPC_ENDPOINT_URL,
        USE_CUSTOM_BASE_URL,
        CUSTOM_BASE_URL,
    ];
}

/// Credentials for every provider, as persisted under `apiKeys`.
#[derive(Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiKeys {
    /// AWS access key ID.
    pub aws_access_key: Option<String>,
    /// AWS secret access key.
    pub aws_secret_key: Option<String>,
    /// AWS session token.
    pub aws_session_token: Option<String>,
    /// AWS region.
    pub aws_region: Option<String>,
    /// OpenAI API key.
    pub openai_api_key: Option<String>,
    /// Anthropic API key.
    pub anthropic_api_key: Option<String>,
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("aws_access_key", &self.aws_access_key)
            .field("aws_secret_key", &redact(self.aws_secret_key.as_ref()))
            .field("aws_session_token", &redact(self.aws_session_token.as_ref()))
            .field("aws_region", &self.aws_region)
            .field("openai_api_key", &redact(self.openai_api_key.as_ref()))
            .field("anthropic_api_key", &redact(self.anthropic_api_key.as_ref()))
            .finish()
    }
}

/// Typed view of the persisted settings.
#[derive(Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Selected provider key, unparsed.
    pub api_provider: Option<String>,
    /// Credentials for all providers.
    pub api_keys: Option<ApiKeys>,
    /// Model identifier for the selected provider.
    pub selected_model: Option<String>,
    /// Route signed requests through [`Settings::vpc_endpoint_url`].
    pub use_custom_vpc_endpoint: bool,
    /// Private endpoint base URL for the signed provider.
    pub vpc_endpoint_url: Option<String>,
    /// Route Anthropic requests through [`Settings::custom_base_url`].
    pub use_custom_base_url: bool,
    /// Custom base URL for the Anthropic provider.
    pub custom_base_url: Option<String>,
}

impl Settings {
    /// Build settings from the raw key-value map read from a store.
    ///
    /// Unknown keys are ignored; `null` values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSettings`] if a known key holds a value of
    /// the wrong type.
    pub fn from_map(map: SettingsMap) -> ConfigResult<Self> {
        let known: SettingsMap = map
            .into_iter()
            .filter(|(k, v)| keys::ALL.contains(&k.as_str()) && !v.is_null())
            .collect();
        serde_json::from_value(Value::Object(known))
            .map_err(|e| ConfigError::InvalidSettings(e.to_string()))
    }

    /// Encode the settings as a key-value map for writing back to a store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSettings`] if serialization fails.
    pub fn to_map(&self) -> ConfigResult<SettingsMap> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ConfigError::InvalidSettings(
                "settings did not serialize to an object".to_owned(),
            )),
            Err(e) => Err(ConfigError::InvalidSettings(e.to_string())),
        }
    }

    /// The configured provider.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] when no provider or no credentials
    /// are stored, and [`ConfigError::UnsupportedProvider`] for an unknown key.
    pub fn provider(&self) -> ConfigResult<Provider> {
        let key = non_empty(self.api_provider.as_ref()).ok_or(ConfigError::NotConfigured)?;
        if self.api_keys.is_none() {
            return Err(ConfigError::NotConfigured);
        }
        key.parse()
    }

    /// The selected model identifier, if one is stored and non-empty.
    #[must_use]
    pub fn selected_model(&self) -> Option<&str> {
        non_empty(self.selected_model.as_ref())
    }

    /// Extract the credentials for `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredentials`] if a required field is empty.
    /// The signed provider needs the key pair and a region; the other two need
    /// their API key.
    pub fn credentials(&self, provider: Provider) -> ConfigResult<Credentials> {
        let keys = self
            .api_keys
            .as_ref()
            .ok_or(ConfigError::MissingCredentials(provider))?;
        let missing = || ConfigError::MissingCredentials(provider);

        match provider {
            Provider::Bedrock => Ok(Credentials::Bedrock {
                access_key_id: non_empty(keys.aws_access_key.as_ref())
                    .ok_or_else(missing)?
                    .to_owned(),
                secret_access_key: non_empty(keys.aws_secret_key.as_ref())
                    .ok_or_else(missing)?
                    .to_owned(),
                region: non_empty(keys.aws_region.as_ref())
                    .ok_or_else(missing)?
                    .to_owned(),
                session_token: non_empty(keys.aws_session_token.as_ref()).map(ToOwned::to_owned),
            }),
            Provider::OpenAi => Ok(Credentials::OpenAi {
                api_key: non_empty(keys.openai_api_key.as_ref())
                    .ok_or_else(missing)?
                    .to_owned(),
            }),
            Provider::Anthropic => Ok(Credentials::Anthropic {
                api_key: non_empty(keys.anthropic_api_key.as_ref())
                    .ok_or_else(missing)?
                    .to_owned(),
            }),
        }
    }

    /// Base URL that replaces the provider's public endpoint, if enabled.
    ///
    /// Trailing slashes are stripped.
    #[must_use]
    pub fn endpoint_override(&self, provider: Provider) -> Option<&str> {
        let url = match provider {
            Provider::Bedrock if self.use_custom_vpc_endpoint => self.vpc_endpoint_url.as_ref(),
            Provider::Anthropic if self.use_custom_base_url => self.custom_base_url.as_ref(),
            _ => None,
        };
        non_empty(url).map(|u| u.trim_end_matches('/'))
    }

    /// Check the fields the settings form requires before saving.
    ///
    /// The signed provider requires a region; the bearer providers require
    /// their API key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for the first missing field, or
    /// the errors of [`Settings::provider`].
    pub fn validate(&self) -> ConfigResult<()> {
        let provider = self.provider()?;
        let keys = self.api_keys.clone().unwrap_or_default();
        let (field, value) = match provider {
            Provider::Bedrock => ("awsRegion", keys.aws_region),
            Provider::OpenAi => ("openaiApiKey", keys.openai_api_key),
            Provider::Anthropic => ("anthropicApiKey", keys.anthropic_api_key),
        };
        if non_empty(value.as_ref()).is_none() {
            return Err(ConfigError::MissingField { provider, field });
        }
        Ok(())
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_provider", &self.api_provider)
            .field("api_keys", &self.api_keys)
            .field("selected_model", &self.selected_model)
            .field("use_custom_vpc_endpoint", &self.use_custom_vpc_endpoint)
            .field("vpc_endpoint_url", &self.vpc_endpoint_url)
            .field("use_custom_base_url", &self.use_custom_base_url)
            .field("custom_base_url", &self.custom_base_url)
            .finish()
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

fn redact(value: Option<&String>) -> Option<&'static str> {
    value.filter(|v| !v.is_empty()).map(|_| "***")
}
