//! Provider adapters.
//!
//! An adapter turns a [`ChatRequest`] into the provider's HTTP request and
//! the provider's success body back into text. Adapters do no I/O.
//!
//! - [`BedrockAdapter`] - SigV4-signed Bedrock `invoke`
//! - [`OpenAiAdapter`] - bearer-token chat completions
//! - [`AnthropicAdapter`] - API-key messages endpoint

mod anthropic;
mod bedrock;
mod openai;

use bytes::Bytes;
use chatgate_core::{ChatRequest, ConfigError, Credentials, ModelCatalog, ModelCheck, Provider};

pub use anthropic::AnthropicAdapter;
pub use bedrock::BedrockAdapter;
pub use openai::OpenAiAdapter;

use crate::error::DispatchError;

/// Ceiling on generated tokens for the providers that require one.
pub const MAX_OUTPUT_TOKENS: u32 = 32_000;

/// Per-dispatch inputs that come from settings rather than the chat request.
#[derive(Debug, Clone, Copy)]
pub struct RequestOptions<'a> {
    /// Model identifier, already validated.
    pub model: &'a str,
    /// Base URL replacing the provider's public endpoint.
    pub endpoint: Option<&'a str>,
}

impl<'a> RequestOptions<'a> {
    /// Options for `model` against the public endpoint.
    #[must_use]
    pub fn new(model: &'a str) -> Self {
        Self {
            model,
            endpoint: None,
        }
    }

    /// Route the request to `endpoint` instead.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Option<&'a str>) -> Self {
        self.endpoint = endpoint;
        self
    }
}

/// A fully built HTTP request, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    /// Target URL. Always sent with `POST`.
    pub url: String,
    /// Headers to send, in order.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Bytes,
}

impl PreparedRequest {
    /// Look up a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Provider-specific request building and response parsing.
pub trait ProviderAdapter: Send + Sync {
    /// The backend this adapter talks to.
    fn provider(&self) -> Provider;

    /// Build the HTTP request for `request`.
    ///
    /// # Errors
    ///
    /// Fails if `credentials` belong to another provider, or if signing fails.
    fn build_request(
        &self,
        request: &ChatRequest,
        credentials: &Credentials,
        options: &RequestOptions<'_>,
    ) -> Result<PreparedRequest, DispatchError>;

    /// Extract the reply text from a success body.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MalformedResponse`] if the expected field is absent.
    fn parse_response(&self, body: &[u8]) -> Result<String, DispatchError>;

    /// Validate the selected model, falling back to the provider default.
    fn validate_model(&self, requested: Option<&str>) -> ModelCheck;
}

/// Select the adapter for `provider`, with its model policy from `catalog`.
#[must_use]
pub fn adapter_for(provider: Provider, catalog: &ModelCatalog) -> Box<dyn ProviderAdapter> {
    let policy = catalog.policy(provider).clone();
    match provider {
        Provider::Bedrock => Box::new(BedrockAdapter::new(policy)),
        Provider::OpenAi => Box::new(OpenAiAdapter::new(policy)),
        Provider::Anthropic => Box::new(AnthropicAdapter::new(policy)),
    }
}

fn credentials_mismatch(provider: Provider) -> DispatchError {
    DispatchError::ConfigurationMissing(ConfigError::MissingCredentials(provider))
}

fn encode_body<T: serde::Serialize>(provider: Provider, body: &T) -> Result<Bytes, DispatchError> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .map_err(|e| DispatchError::malformed(provider, format!("failed to encode request: {e}")))
}

/// Success body shared by the messages-style APIs: `content[0].text`.
#[derive(Debug, serde::Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, serde::Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

fn parse_messages_response(provider: Provider, body: &[u8]) -> Result<String, DispatchError> {
    let parsed: MessagesResponse = serde_json::from_slice(body)
        .map_err(|e| DispatchError::malformed(provider, e.to_string()))?;
    parsed
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .ok_or_else(|| DispatchError::malformed(provider, "missing content[0].text"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_select_adapter_by_provider() {
        let catalog = ModelCatalog::default();
        for provider in Provider::ALL {
            assert_eq!(adapter_for(provider, &catalog).provider(), provider);
        }
    }

    #[test]
    fn test_should_apply_catalog_policy_in_adapter() {
        let catalog = ModelCatalog::default();
        let bedrock = adapter_for(Provider::Bedrock, &catalog);
        assert!(bedrock.validate_model(Some("bogus-id")).needs_correction());

        let openai = adapter_for(Provider::OpenAi, &catalog);
        assert_eq!(
            openai.validate_model(Some("gpt-4o")),
            ModelCheck::Accepted("gpt-4o".to_owned())
        );
    }

    #[test]
    fn test_should_parse_first_content_block() {
        let body = br#"{"content":[{"type":"text","text":"Hi there"},{"type":"text","text":"x"}]}"#;
        assert_eq!(
            parse_messages_response(Provider::Anthropic, body).unwrap(),
            "Hi there"
        );
    }

    #[test]
    fn test_should_reject_response_without_content() {
        let bodies: [&[u8]; 3] = [br#"{"content":[]}"#, br#"{"id":"msg"}"#, b"not json"];
        for body in bodies {
            assert!(matches!(
                parse_messages_response(Provider::Bedrock, body),
                Err(DispatchError::MalformedResponse { provider: Provider::Bedrock, .. })
            ));
        }
    }

    #[test]
    fn test_should_find_headers_case_insensitively() {
        let prepared = PreparedRequest {
            url: "https://example.com".to_owned(),
            headers: vec![("Content-Type".to_owned(), "application/json".to_owned())],
            body: Bytes::new(),
        };
        assert_eq!(prepared.header("content-type"), Some("application/json"));
        assert_eq!(prepared.header("accept"), None);
    }
}
