//! Anthropic messages API adapter.

use chatgate_core::{ChatMessage, ChatRequest, Credentials, ModelCheck, ModelPolicy, Provider};

use super::{
    MAX_OUTPUT_TOKENS, PreparedRequest, ProviderAdapter, RequestOptions, credentials_mismatch,
    encode_body, parse_messages_response,
};
use crate::error::DispatchError;

/// Public base URL of the messages API.
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Value of the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(serde::Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

/// Adapter for the Anthropic API-key endpoint.
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    policy: ModelPolicy,
}

impl AnthropicAdapter {
    /// Create an adapter validating models with `policy`.
    #[must_use]
    pub fn new(policy: ModelPolicy) -> Self {
        Self { policy }
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn build_request(
        &self,
        request: &ChatRequest,
        credentials: &Credentials,
        options: &RequestOptions<'_>,
    ) -> Result<PreparedRequest, DispatchError> {
        let Credentials::Anthropic { api_key } = credentials else {
            return Err(credentials_mismatch(Provider::Anthropic));
        };

        let base = options.endpoint.unwrap_or(ANTHROPIC_BASE_URL);
        let body = encode_body(
            Provider::Anthropic,
            &MessagesBody {
                model: options.model,
                max_tokens: MAX_OUTPUT_TOKENS,
                messages: &request.messages,
                system: request.system_prompt(),
            },
        )?;

        Ok(PreparedRequest {
            url: format!("{base}/v1/messages"),
            headers: vec![
                ("Content-Type".to_owned(), "application/json".to_owned()),
                ("x-api-key".to_owned(), api_key.clone()),
                ("anthropic-version".to_owned(), ANTHROPIC_VERSION.to_owned()),
                (
                    "anthropic-dangerous-direct-browser-access".to_owned(),
                    "true".to_owned(),
                ),
            ],
            body,
        })
    }

    fn parse_response(&self, body: &[u8]) -> Result<String, DispatchError> {
        parse_messages_response(Provider::Anthropic, body)
    }

    fn validate_model(&self, requested: Option<&str>) -> ModelCheck {
        self.policy.validate(requested)
    }
}
