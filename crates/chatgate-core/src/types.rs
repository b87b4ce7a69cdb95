//! Domain types shared by the signing and dispatch crates.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// An inference backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// AWS Bedrock, authenticated with SigV4.
    Bedrock,
    /// OpenAI chat completions, authenticated with a bearer token.
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages API, authenticated with an API-key header.
    Anthropic,
}

impl Provider {
    /// All providers, in settings-form order.
    pub const ALL: [Self; 3] = [Self::Bedrock, Self::OpenAi, Self::Anthropic];

    /// The key stored in the `apiProvider` setting.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bedrock => "bedrock",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    /// Human-readable name used in error messages.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Bedrock => "Bedrock",
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedProvider(s.to_owned()))
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human user.
    User,
    /// The model.
    Assistant,
    /// Instructions for the model.
    System,
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A message from the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// A message from the model.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// A system instruction.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// A logical chat request, as sent by the chat surface.
///
/// Serializes to `{"messages": [...], "systemPrompt": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Optional system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    /// Create a request from a list of messages.
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            system_prompt: None,
        }
    }

    /// Attach a system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// The system prompt, if one is set and non-empty.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref().filter(|p| !p.is_empty())
    }
}

/// Credentials for exactly one provider.
///
/// Built from persisted settings at the start of every dispatch and dropped
/// at its end.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// AWS key pair, region and optional session token.
    Bedrock {
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region, e.g. `us-east-1`.
        region: String,
        /// Session token for temporary credentials.
        session_token: Option<String>,
    },
    /// OpenAI API key.
    OpenAi {
        /// Bearer token.
        api_key: String,
    },
    /// Anthropic API key.
    Anthropic {
        /// Value of the `x-api-key` header.
        api_key: String,
    },
}

impl Credentials {
    /// The provider these credentials belong to.
    #[must_use]
    pub fn provider(&self) -> Provider {
        match self {
            Self::Bedrock { .. } => Provider::Bedrock,
            Self::OpenAi { .. } => Provider::OpenAi,
            Self::Anthropic { .. } => Provider::Anthropic,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bedrock {
                access_key_id,
                region,
                session_token,
                ..
            } => f
                .debug_struct("Bedrock")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"***")
                .field("region", region)
                .field("session_token", &session_token.as_ref().map(|_| "***"))
                .finish(),
            Self::OpenAi { .. } => f.debug_struct("OpenAi").field("api_key", &"***").finish(),
            Self::Anthropic { .. } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_provider_keys() {
        assert_eq!("bedrock".parse::<Provider>().unwrap(), Provider::Bedrock);
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("anthropic".parse::<Provider>().unwrap(), Provider::Anthropic);
    }

    #[test]
    fn test_should_reject_unknown_provider_key() {
        let result = "gemini".parse::<Provider>();
        assert!(matches!(result, Err(ConfigError::UnsupportedProvider(ref p)) if p == "gemini"));
    }

    #[test]
    fn test_should_deserialize_chat_request_wire_shape() {
        let json = r#"{"messages":[{"role":"user","content":"Hello"}],"systemPrompt":"Be brief"}"#;
        let request: ChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.messages, vec![ChatMessage::user("Hello")]);
        assert_eq!(request.system_prompt(), Some("Be brief"));
    }

    #[test]
    fn test_should_treat_empty_system_prompt_as_absent() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]).with_system_prompt("");
        assert_eq!(request.system_prompt(), None);
    }

    #[test]
    fn test_should_omit_missing_system_prompt_when_serializing() {
        let request = ChatRequest::new(vec![ChatMessage::assistant("ok")]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"messages": [{"role": "assistant", "content": "ok"}]})
        );
    }

    #[test]
    fn test_should_redact_credentials_in_debug_output() {
        let creds = Credentials::Bedrock {
            access_key_id: "AKID".to_owned(),
            secret_access_key: "very-secret".to_owned(),
            region: "us-east-1".to_owned(),
            session_token: Some("token-value".to_owned()),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("AKID"));
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("token-value"));

        let openai = Credentials::OpenAi {
            api_key: "sk-123".to_owned(),
        };
        assert!(!format!("{openai:?}").contains("sk-123"));
        assert_eq!(openai.provider(), Provider::OpenAi);
    }
}
