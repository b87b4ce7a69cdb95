//! Model identifier policies.
//!
//! Every provider has a default model. A provider may additionally carry an
//! allow-list; identifiers outside it are replaced by the default. Allow-lists
//! are data, supplied per provider through [`ModelCatalog`], and only the
//! signed provider ships with one.

use crate::types::Provider;

/// Default model for the signed provider.
pub const DEFAULT_BEDROCK_MODEL: &str = "us.anthropic.claude-sonnet-4-20250514-v1:0";

/// Models the signed provider accepts.
pub const BEDROCK_MODELS: &[&str] = &[
    "us.anthropic.claude-opus-4-20250514-v1:0",
    "us.anthropic.claude-sonnet-4-20250514-v1:0",
];

/// Default model for the OpenAI provider.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";

/// Default model for the Anthropic provider.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Outcome of validating a model identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelCheck {
    /// The requested identifier is acceptable as-is.
    Accepted(String),
    /// Nothing was requested; the default applies. No correction is needed.
    Defaulted(String),
    /// The requested identifier was rejected and replaced by the default.
    Corrected {
        /// The rejected identifier.
        requested: String,
        /// The replacement.
        model: String,
    },
}

impl ModelCheck {
    /// The identifier to use.
    #[must_use]
    pub fn model(&self) -> &str {
        match self {
            Self::Accepted(model) | Self::Defaulted(model) | Self::Corrected { model, .. } => model,
        }
    }

    /// Consume the check and return the identifier to use.
    #[must_use]
    pub fn into_model(self) -> String {
        match self {
            Self::Accepted(model) | Self::Defaulted(model) | Self::Corrected { model, .. } => model,
        }
    }

    /// Whether the persisted setting must be rewritten.
    #[must_use]
    pub fn needs_correction(&self) -> bool {
        matches!(self, Self::Corrected { .. })
    }
}

/// Default model and optional allow-list for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPolicy {
    default_model: String,
    allowed: Option<Vec<String>>,
}

impl ModelPolicy {
    /// A policy that accepts any non-empty identifier.
    pub fn open(default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
            allowed: None,
        }
    }

    /// A policy that accepts only the listed identifiers.
    pub fn restricted<I, S>(default_model: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            default_model: default_model.into(),
            allowed: Some(allowed.into_iter().map(Into::into).collect()),
        }
    }

    /// The documented default identifier.
    #[must_use]
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// The allow-list, if this policy has one.
    #[must_use]
    pub fn allowed(&self) -> Option<&[String]> {
        self.allowed.as_deref()
    }

    /// Validate a requested identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatgate_core::models::{ModelCheck, ModelPolicy};
    ///
    /// let policy = ModelPolicy::restricted("a", ["a", "b"]);
    /// assert_eq!(policy.validate(Some("b")), ModelCheck::Accepted("b".to_owned()));
    /// assert!(policy.validate(Some("bogus-id")).needs_correction());
    /// assert_eq!(policy.validate(None), ModelCheck::Defaulted("a".to_owned()));
    /// ```
    #[must_use]
    pub fn validate(&self, requested: Option<&str>) -> ModelCheck {
        let Some(requested) = requested.filter(|r| !r.trim().is_empty()) else {
            return ModelCheck::Defaulted(self.default_model.clone());
        };

        match &self.allowed {
            Some(allowed) if !allowed.iter().any(|m| m == requested) => ModelCheck::Corrected {
                requested: requested.to_owned(),
                model: self.default_model.clone(),
            },
            _ => ModelCheck::Accepted(requested.to_owned()),
        }
    }
}

/// Model policies for all providers. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    bedrock: ModelPolicy,
    openai: ModelPolicy,
    anthropic: ModelPolicy,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            bedrock: ModelPolicy::restricted(DEFAULT_BEDROCK_MODEL, BEDROCK_MODELS.iter().copied()),
            openai: ModelPolicy::open(DEFAULT_OPENAI_MODEL),
            anthropic: ModelPolicy::open(DEFAULT_ANTHROPIC_MODEL),
        }
    }
}

impl ModelCatalog {
    /// Replace the policy for one provider.
    #[must_use]
    pub fn with_policy(mut self, provider: Provider, policy: ModelPolicy) -> Self {
        *self.policy_mut(provider) = policy;
        self
    }

    /// The policy for `provider`.
    #[must_use]
    pub fn policy(&self, provider: Provider) -> &ModelPolicy {
        match provider {
            Provider::Bedrock => &self.bedrock,
            Provider::OpenAi => &self.openai,
            Provider::Anthropic => &self.anthropic,
        }
    }

    fn policy_mut(&mut self, provider: Provider) -> &mut ModelPolicy {
        match provider {
            Provider::Bedrock => &mut self.bedrock,
            Provider::OpenAi => &mut self.openai,
            Provider::Anthropic => &mut self.anthropic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_accept_allowed_bedrock_models() {
        let catalog = ModelCatalog::default();
        for model in BEDROCK_MODELS {
            assert_eq!(
                catalog.policy(Provider::Bedrock).validate(Some(*model)),
                ModelCheck::Accepted((*model).to_owned())
            );
        }
    }

    #[test]
    fn test_should_correct_unknown_bedrock_model_to_default() {
        let check = ModelCatalog::default()
            .policy(Provider::Bedrock)
            .validate(Some("bogus-id"));
        assert_eq!(
            check,
            ModelCheck::Corrected {
                requested: "bogus-id".to_owned(),
                model: DEFAULT_BEDROCK_MODEL.to_owned(),
            }
        );
        assert_eq!(check.model(), DEFAULT_BEDROCK_MODEL);
    }

    #[test]
    fn test_should_default_when_nothing_selected() {
        let catalog = ModelCatalog::default();
        assert_eq!(
            catalog.policy(Provider::OpenAi).validate(None),
            ModelCheck::Defaulted(DEFAULT_OPENAI_MODEL.to_owned())
        );
        assert_eq!(
            catalog.policy(Provider::Bedrock).validate(Some("  ")),
            ModelCheck::Defaulted(DEFAULT_BEDROCK_MODEL.to_owned())
        );
    }

    #[test]
    fn test_should_accept_any_model_for_open_policies() {
        let catalog = ModelCatalog::default();
        let check = catalog.policy(Provider::Anthropic).validate(Some("claude-opus-4-1"));
        assert_eq!(check, ModelCheck::Accepted("claude-opus-4-1".to_owned()));
        assert!(!check.needs_correction());
    }

    #[test]
    fn test_should_apply_caller_supplied_allow_list() {
        let catalog = ModelCatalog::default().with_policy(
            Provider::OpenAi,
            ModelPolicy::restricted("gpt-4.1", ["gpt-4.1", "gpt-4o"]),
        );
        assert!(
            catalog
                .policy(Provider::OpenAi)
                .validate(Some("gpt-3.5-turbo"))
                .needs_correction()
        );
        assert_eq!(
            catalog.policy(Provider::OpenAi).allowed().map(<[String]>::len),
            Some(2)
        );
    }
}
