//! OpenAI chat completions adapter.

use std::borrow::Cow;

use chatgate_core::{ChatMessage, ChatRequest, Credentials, ModelCheck, ModelPolicy, Provider};

use super::{PreparedRequest, ProviderAdapter, RequestOptions, credentials_mismatch, encode_body};
use crate::error::DispatchError;

/// Chat completions endpoint.
pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Sampling temperature sent with every request.
const TEMPERATURE: f64 = 0.7;

#[derive(serde::Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<Cow<'a, ChatMessage>>,
    temperature: f64,
}

#[derive(Debug, serde::Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, serde::Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, serde::Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Adapter for the OpenAI bearer-token API.
///
/// The API has no system field, so a system prompt travels as the first
/// message with role `system`.
#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    policy: ModelPolicy,
}

impl OpenAiAdapter {
    /// Create an adapter validating models with `policy`.
    #[must_use]
    pub fn new(policy: ModelPolicy) -> Self {
        Self { policy }
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn build_request(
        &self,
        request: &ChatRequest,
        credentials: &Credentials,
        options: &RequestOptions<'_>,
    ) -> Result<PreparedRequest, DispatchError> {
        let Credentials::OpenAi { api_key } = credentials else {
            return Err(credentials_mismatch(Provider::OpenAi));
        };

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(prompt) = request.system_prompt() {
            messages.push(Cow::Owned(ChatMessage::system(prompt)));
        }
        messages.extend(request.messages.iter().map(Cow::Borrowed));

        let body = encode_body(
            Provider::OpenAi,
            &CompletionBody {
                model: options.model,
                messages,
                temperature: TEMPERATURE,
            },
        )?;

        Ok(PreparedRequest {
            url: OPENAI_CHAT_URL.to_owned(),
            headers: vec![
                ("Content-Type".to_owned(), "application/json".to_owned()),
                ("Authorization".to_owned(), format!("Bearer {api_key}")),
            ],
            body,
        })
    }

    fn parse_response(&self, body: &[u8]) -> Result<String, DispatchError> {
        let parsed: CompletionResponse = serde_json::from_slice(body)
            .map_err(|e| DispatchError::malformed(Provider::OpenAi, e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| {
                DispatchError::malformed(Provider::OpenAi, "missing choices[0].message.content")
            })
    }

    fn validate_model(&self, requested: Option<&str>) -> ModelCheck {
        self.policy.validate(requested)
    }
}

#[cfg(test)]
mod tests {
    use chatgate_core::ModelCatalog;

    use super::*;

    fn adapter() -> OpenAiAdapter {
        OpenAiAdapter::new(ModelCatalog::default().policy(Provider::OpenAi).clone())
    }

    fn credentials() -> Credentials {
        Credentials::OpenAi {
            api_key: "sk-test".to_owned(),
        }
    }

    fn body_of(prepared: &PreparedRequest) -> serde_json::Value {
        serde_json::from_slice(&prepared.body).unwrap()
    }

    #[test]
    fn test_should_prepend_system_prompt_as_first_message() {
        let request = ChatRequest::new(vec![
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi"),
        ])
        .with_system_prompt("Be concise.");
        let prepared = adapter()
            .build_request(&request, &credentials(), &RequestOptions::new("gpt-4.1"))
            .unwrap();

        let body = body_of(&prepared);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Be concise.");
        assert_eq!(body["messages"][1]["content"], "Hello");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(3));
        assert_eq!(body["model"], "gpt-4.1");
    }

    #[test]
    fn test_should_not_add_system_message_without_prompt() {
        let request = ChatRequest::new(vec![ChatMessage::user("Hello")]);
        let prepared = adapter()
            .build_request(&request, &credentials(), &RequestOptions::new("gpt-4.1"))
            .unwrap();
        let body = body_of(&prepared);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_should_authenticate_with_bearer_token() {
        let request = ChatRequest::new(vec![ChatMessage::user("Hello")]);
        let prepared = adapter()
            .build_request(&request, &credentials(), &RequestOptions::new("gpt-4.1"))
            .unwrap();
        assert_eq!(prepared.url, OPENAI_CHAT_URL);
        assert_eq!(prepared.header("authorization"), Some("Bearer sk-test"));
        let temperature = body_of(&prepared)["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_should_parse_first_choice() {
        let body = br#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Hello!"}}]}"#;
        assert_eq!(adapter().parse_response(body).unwrap(), "Hello!");
    }

    #[test]
    fn test_should_reject_response_without_choices() {
        let result = adapter().parse_response(br#"{"choices":[]}"#);
        assert!(matches!(
            result,
            Err(DispatchError::MalformedResponse { provider: Provider::OpenAi, .. })
        ));
    }
}
