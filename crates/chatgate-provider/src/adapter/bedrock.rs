//! Bedrock adapter: SigV4-signed `invoke` requests.

use chatgate_auth::{SigningContext, SigningCredentials, sign_request};
use chatgate_core::{ChatMessage, ChatRequest, Credentials, ModelCheck, ModelPolicy, Provider};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{
    MAX_OUTPUT_TOKENS, PreparedRequest, ProviderAdapter, RequestOptions, credentials_mismatch,
    encode_body, parse_messages_response,
};
use crate::error::DispatchError;

/// Messages API version expected by Anthropic models on Bedrock.
pub const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// System prompt used when the request carries none.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant analyzing web content.";

/// Service name in the SigV4 credential scope.
const SERVICE: &str = "bedrock";

#[derive(serde::Serialize)]
struct InvokeBody<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
    system: &'a str,
}

/// Adapter for the signed Bedrock runtime.
#[derive(Debug, Clone)]
pub struct BedrockAdapter {
    policy: ModelPolicy,
    signing_time: Option<DateTime<Utc>>,
}

impl BedrockAdapter {
    /// Create an adapter validating models with `policy`.
    #[must_use]
    pub fn new(policy: ModelPolicy) -> Self {
        Self {
            policy,
            signing_time: None,
        }
    }

    /// Sign every request at `timestamp` instead of the current time.
    #[must_use]
    pub fn with_signing_time(mut self, timestamp: DateTime<Utc>) -> Self {
        self.signing_time = Some(timestamp);
        self
    }

    fn invoke_url(region: &str, model: &str, endpoint: Option<&str>) -> String {
        match endpoint {
            Some(base) => format!("{base}/model/{model}/invoke"),
            None => format!("https://bedrock-runtime.{region}.amazonaws.com/model/{model}/invoke"),
        }
    }
}

impl ProviderAdapter for BedrockAdapter {
    fn provider(&self) -> Provider {
        Provider::Bedrock
    }

    fn build_request(
        &self,
        request: &ChatRequest,
        credentials: &Credentials,
        options: &RequestOptions<'_>,
    ) -> Result<PreparedRequest, DispatchError> {
        let Credentials::Bedrock {
            access_key_id,
            secret_access_key,
            region,
            session_token,
        } = credentials
        else {
            return Err(credentials_mismatch(Provider::Bedrock));
        };

        let url = Self::invoke_url(region, options.model, options.endpoint);
        let body = encode_body(
            Provider::Bedrock,
            &InvokeBody {
                anthropic_version: BEDROCK_ANTHROPIC_VERSION,
                max_tokens: MAX_OUTPUT_TOKENS,
                messages: &request.messages,
                system: request.system_prompt().unwrap_or(DEFAULT_SYSTEM_PROMPT),
            },
        )?;

        let signing_credentials =
            SigningCredentials::new(access_key_id, secret_access_key, session_token.clone());
        let mut ctx = SigningContext::new("POST", &url, &body, region, SERVICE);
        if let Some(timestamp) = self.signing_time {
            ctx = ctx.with_timestamp(timestamp);
        }
        let signed = sign_request(&ctx, &signing_credentials)?;
        debug!(%url, signed_headers = %signed.signed_headers, "Built Bedrock request");

        let mut headers = vec![
            ("Content-Type".to_owned(), "application/json".to_owned()),
            ("Accept".to_owned(), "application/json".to_owned()),
        ];
        headers.extend(
            signed
                .header_pairs()
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value)),
        );

        Ok(PreparedRequest { url, headers, body })
    }

    fn parse_response(&self, body: &[u8]) -> Result<String, DispatchError> {
        parse_messages_response(Provider::Bedrock, body)
    }

    fn validate_model(&self, requested: Option<&str>) -> ModelCheck {
        self.policy.validate(requested)
    }
}

#[cfg(test)]
mod tests {
    use chatgate_core::ModelCatalog;
    use chatgate_core::models::DEFAULT_BEDROCK_MODEL;
    use chrono::TimeZone;

    use super::*;

    fn adapter() -> BedrockAdapter {
        BedrockAdapter::new(ModelCatalog::default().policy(Provider::Bedrock).clone())
            .with_signing_time(Utc.with_ymd_and_hms(2025, 5, 14, 8, 30, 0).unwrap())
    }

    fn credentials(session_token: Option<&str>) -> Credentials {
        Credentials::Bedrock {
            access_key_id: "AKIDEXAMPLE".to_owned(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_owned(),
            region: "us-east-1".to_owned(),
            session_token: session_token.map(ToOwned::to_owned),
        }
    }

    fn hello() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("Hello")])
    }

    fn is_lower_hex_64(s: &str) -> bool {
        s.len() == 64 && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
    }

    #[test]
    fn test_should_sign_hello_request_for_us_east_1() {
        let prepared = adapter()
            .build_request(
                &hello(),
                &credentials(None),
                &RequestOptions::new(DEFAULT_BEDROCK_MODEL),
            )
            .unwrap();

        assert_eq!(
            prepared.url,
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/us.anthropic.claude-sonnet-4-20250514-v1:0/invoke"
        );

        let authorization = prepared.header("authorization").unwrap();
        let (prefix, signature) = authorization.split_once(", Signature=").unwrap();
        assert_eq!(
            prefix,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20250514/us-east-1/bedrock/aws4_request, SignedHeaders=host;x-amz-date"
        );
        assert!(is_lower_hex_64(signature));
        assert_eq!(prepared.header("x-amz-date"), Some("20250514T083000Z"));
        assert_eq!(
            prepared.header("host"),
            Some("bedrock-runtime.us-east-1.amazonaws.com")
        );
        assert_eq!(prepared.header("x-amz-security-token"), None);
    }

    #[test]
    fn test_should_send_every_signed_header() {
        let prepared = adapter()
            .build_request(
                &hello(),
                &credentials(Some("session-token")),
                &RequestOptions::new(DEFAULT_BEDROCK_MODEL),
            )
            .unwrap();

        let authorization = prepared.header("authorization").unwrap();
        assert!(authorization.contains("SignedHeaders=host;x-amz-date;x-amz-security-token,"));
        for name in ["host", "x-amz-date", "x-amz-security-token"] {
            assert!(prepared.header(name).is_some(), "missing {name}");
        }
        assert_eq!(prepared.header("x-amz-security-token"), Some("session-token"));
    }

    #[test]
    fn test_should_build_body_with_default_system_prompt() {
        let prepared = adapter()
            .build_request(
                &hello(),
                &credentials(None),
                &RequestOptions::new(DEFAULT_BEDROCK_MODEL),
            )
            .unwrap();

        let body: serde_json::Value = serde_json::from_slice(&prepared.body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "anthropic_version": "bedrock-2023-05-31",
                "max_tokens": 32000,
                "messages": [{"role": "user", "content": "Hello"}],
                "system": DEFAULT_SYSTEM_PROMPT
            })
        );
        assert_eq!(prepared.header("content-type"), Some("application/json"));
        assert_eq!(prepared.header("accept"), Some("application/json"));
    }

    #[test]
    fn test_should_use_supplied_system_prompt() {
        let request = hello().with_system_prompt("Summarize the page.");
        let prepared = adapter()
            .build_request(
                &request,
                &credentials(None),
                &RequestOptions::new(DEFAULT_BEDROCK_MODEL),
            )
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&prepared.body).unwrap();
        assert_eq!(body["system"], "Summarize the page.");
    }

    #[test]
    fn test_should_sign_host_of_custom_endpoint() {
        let options =
            RequestOptions::new(DEFAULT_BEDROCK_MODEL).with_endpoint(Some("http://localhost:8080"));
        let prepared = adapter()
            .build_request(&hello(), &credentials(None), &options)
            .unwrap();
        assert_eq!(
            prepared.url,
            "http://localhost:8080/model/us.anthropic.claude-sonnet-4-20250514-v1:0/invoke"
        );
        assert_eq!(prepared.header("host"), Some("localhost:8080"));
    }

    #[test]
    fn test_should_change_signature_when_body_changes() {
        let options = RequestOptions::new(DEFAULT_BEDROCK_MODEL);
        let a = adapter()
            .build_request(&hello(), &credentials(None), &options)
            .unwrap();
        let b = adapter()
            .build_request(
                &ChatRequest::new(vec![ChatMessage::user("Hellp")]),
                &credentials(None),
                &options,
            )
            .unwrap();
        let again = adapter()
            .build_request(&hello(), &credentials(None), &options)
            .unwrap();

        assert_ne!(a.header("authorization"), b.header("authorization"));
        assert_eq!(a.header("authorization"), again.header("authorization"));
    }

    #[test]
    fn test_should_reject_foreign_credentials() {
        let result = adapter().build_request(
            &hello(),
            &Credentials::OpenAi {
                api_key: "sk".to_owned(),
            },
            &RequestOptions::new(DEFAULT_BEDROCK_MODEL),
        );
        assert!(matches!(result, Err(DispatchError::ConfigurationMissing(_))));
    }

    #[test]
    fn test_should_replace_unknown_model_with_default() {
        let check = adapter().validate_model(Some("bogus-id"));
        assert_eq!(check.model(), DEFAULT_BEDROCK_MODEL);
        assert!(check.needs_correction());
    }

    #[test]
    fn test_should_parse_invoke_response() {
        let body = br#"{"id":"msg_1","content":[{"type":"text","text":"Hello!"}],"stop_reason":"end_turn"}"#;
        assert_eq!(adapter().parse_response(body).unwrap(), "Hello!");
    }
}
