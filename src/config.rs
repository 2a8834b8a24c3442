//! Configuration types for the conversation engine.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::GatewayError;

/// Top-level configuration for the conversation engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Progressive display (typewriter reveal) settings.
    pub reveal: RevealConfig,
    /// Speech side-channel settings.
    pub speech: SpeechConfig,
    /// Model provider settings.
    pub provider: ProviderConfig,
    /// User-facing banner and notice copy.
    pub copy: CopyConfig,
}

/// Progressive display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Delay between revealed characters, in milliseconds.
    pub char_delay_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self { char_delay_ms: 20 }
    }
}

/// Speech side-channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Whether finalized replies are mirrored to the speech channel.
    pub enabled: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

/// Model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the generative-language API.
    pub base_url: String,
    /// API key. Empty means "read from the `HARIUM_API_KEY` environment
    /// variable at client construction".
    pub api_key: String,
    /// Model used for text generation.
    pub text_model: String,
    /// Model used for image generation.
    pub image_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: String::new(),
            text_model: "gemini-1.5-flash-latest".to_string(),
            image_model: "gemini-2.0-flash-exp".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key from config or the environment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConfigError`] if neither source has a key.
    pub fn resolve_api_key(&self) -> Result<String, GatewayError> {
        if !self.api_key.is_empty() {
            return Ok(self.api_key.clone());
        }
        std::env::var("HARIUM_API_KEY").map_err(|_| {
            GatewayError::ConfigError(
                "no API key: set provider.api_key or HARIUM_API_KEY".to_string(),
            )
        })
    }
}

/// User-facing copy for banners and failure notices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    /// Banner shown when a conversation starts.
    pub welcome_banner: String,
    /// Banner shown after the context is cleared.
    pub cleared_banner: String,
    /// Notice written into the conversation when text generation fails.
    pub text_failure_notice: String,
    /// Notice written into the conversation when image generation fails.
    pub image_failure_notice: String,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            welcome_banner: "Hi! How can I help you today? ✨".to_string(),
            cleared_banner: "Context cleared. How can I help you now? ✨".to_string(),
            text_failure_notice:
                "Sorry, I ran into a problem answering that. Please try again.".to_string(),
            image_failure_notice:
                "Sorry, I couldn't generate that image. Please try again.".to_string(),
        }
    }
}

/// Read an [`EngineConfig`] from a TOML file.
///
/// Missing sections and fields fall back to their defaults.
///
/// # Errors
///
/// Returns [`GatewayError::ConfigError`] if the file cannot be read or
/// parsed.
pub fn read_config(path: &Path) -> Result<EngineConfig, GatewayError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| GatewayError::ConfigError(format!("read {}: {e}", path.display())))?;
    toml::from_str(&raw)
        .map_err(|e| GatewayError::ConfigError(format!("parse {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = EngineConfig::default();
        assert_eq!(config.reveal.char_delay_ms, 20);
        assert!(!config.speech.enabled);
        assert!(config.provider.base_url.starts_with("https://"));
        assert!(config.copy.cleared_banner.contains("Context cleared"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: Result<EngineConfig, _> = toml::from_str(
            r#"
            [reveal]
            char_delay_ms = 5

            [speech]
            enabled = true
            "#,
        );
        let config = match parsed {
            Ok(c) => c,
            Err(e) => unreachable!("parse succeeded: {e}"),
        };
        assert_eq!(config.reveal.char_delay_ms, 5);
        assert!(config.speech.enabled);
        // Untouched sections keep defaults.
        assert_eq!(config.provider.text_model, "gemini-1.5-flash-latest");
    }

    #[test]
    fn read_config_from_file() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => unreachable!("tempdir created: {e}"),
        };
        let path = dir.path().join("harium.toml");
        let written = std::fs::write(
            &path,
            r#"
            [provider]
            base_url = "http://localhost:8080"
            text_model = "test-model"
            "#,
        );
        assert!(written.is_ok());

        let config = read_config(&path);
        let config = match config {
            Ok(c) => c,
            Err(e) => unreachable!("config parsed: {e}"),
        };
        assert_eq!(config.provider.base_url, "http://localhost:8080");
        assert_eq!(config.provider.text_model, "test-model");
        // Default survives.
        assert_eq!(config.provider.image_model, "gemini-2.0-flash-exp");
    }

    #[test]
    fn read_config_missing_file_is_config_error() {
        let result = read_config(Path::new("/nonexistent/harium.toml"));
        assert!(matches!(result, Err(e) if e.code() == "CONFIG_INVALID"));
    }

    #[test]
    fn resolve_api_key_prefers_config() {
        let provider = ProviderConfig {
            api_key: "inline-key".into(),
            ..ProviderConfig::default()
        };
        assert!(matches!(provider.resolve_api_key(), Ok(k) if k == "inline-key"));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = EngineConfig::default();
        let raw = toml::to_string(&config).unwrap_or_default();
        assert!(!raw.is_empty());
        let parsed: Result<EngineConfig, _> = toml::from_str(&raw);
        assert!(parsed.is_ok());
    }
}
