//! Process configuration for the ChatGate binary.
//!
//! All configuration is driven by environment variables. Per-user settings
//! (provider, credentials, model) live in the settings store instead.

use std::path::PathBuf;

/// Default location of the JSON settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "chatgate-settings.json";

/// Global configuration for ChatGate.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatGateConfig {
    /// Path of the JSON settings file.
    pub settings_path: PathBuf,
    /// Log level.
    pub log_level: String,
}

impl Default for ChatGateConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from(DEFAULT_SETTINGS_PATH),
            log_level: "info".to_owned(),
        }
    }
}

impl ChatGateConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("CHATGATE_SETTINGS_PATH") {
            if !v.is_empty() {
                config.settings_path = PathBuf::from(v);
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = ChatGateConfig::default();
        assert_eq!(config.settings_path, PathBuf::from("chatgate-settings.json"));
        assert_eq!(config.log_level, "info");
    }
}
