//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! settings a [`ChatSession`](super::ChatSession) runs with.

use arrrg_derive::CommandLine;

use crate::types::{DEFAULT_TEMPERATURE, KnownModel, Model, ModelCatalog};
use crate::{Error, Result};

/// Default maximum tokens per response.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Command-line arguments for the colloquy-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: claude-opus-4-1-20250805)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 2000)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature, parsed when the config is resolved.
    #[arrrg(optional, "Temperature between 0.0 and 1.0 (default: 0.7)", "TEMP")]
    pub temperature: Option<String>,

    /// API base URL.
    #[arrrg(optional, "API base URL (default: https://api.anthropic.com/v1/)", "URL")]
    pub base_url: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// Optional system prompt to set conversation context.
    pub system_prompt: Option<String>,

    /// Maximum tokens per response, before clamping to the model ceiling.
    pub max_tokens: u32,

    /// Sampling temperature in `[0, 1]`.
    pub temperature: f32,

    /// API base URL override.
    pub base_url: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: claude-opus-4-1-20250805
    /// - Max tokens: 2000
    /// - Temperature: 0.7
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::Known(KnownModel::ClaudeOpus41),
            system_prompt: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            base_url: None,
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<Model>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let defaults = ChatConfig::new();
        let temperature = match args.temperature.as_deref() {
            Some(raw) => raw.trim().parse::<f32>().map_err(|_| {
                Error::validation(
                    format!("--temperature expects a number, got {raw:?}"),
                    Some("temperature".to_string()),
                )
            })?,
            None => defaults.temperature,
        };
        if !(0.0..=1.0).contains(&temperature) {
            return Err(Error::validation(
                format!("--temperature must be between 0.0 and 1.0, got {temperature}"),
                Some("temperature".to_string()),
            ));
        }
        let max_tokens = args.max_tokens.unwrap_or(defaults.max_tokens);
        if max_tokens == 0 {
            return Err(Error::validation(
                "--max-tokens must be at least 1",
                Some("max_tokens".to_string()),
            ));
        }

        let model = args.model.map(Model::from).unwrap_or(defaults.model);
        if ModelCatalog::builtin().get(&model).is_none() {
            return Err(Error::validation(
                format!("--model {model} is not a known model"),
                Some("model".to_string()),
            ));
        }

        Ok(ChatConfig {
            model,
            system_prompt: args.system.filter(|s| !s.trim().is_empty()),
            max_tokens,
            temperature,
            base_url: args.base_url,
            use_color: !args.no_color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model, Model::Known(KnownModel::ClaudeOpus41));
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.temperature, 0.7);
        assert!(config.use_color);
        assert!(config.system_prompt.is_none());
        assert!(config.base_url.is_none());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("claude-3-haiku-20240307".to_string()),
            system: Some("You are helpful.".to_string()),
            max_tokens: Some(1000),
            temperature: Some("0.2".to_string()),
            base_url: Some("http://localhost:8080/v1/".to_string()),
            no_color: true,
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.model, Model::Known(KnownModel::Claude3Haiku20240307));
        assert_eq!(config.system_prompt.as_deref(), Some("You are helpful."));
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080/v1/"));
        assert!(!config.use_color);
    }

    #[test]
    fn config_from_args_rejects_bad_temperature() {
        let args = ChatArgs {
            temperature: Some("2.0".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).unwrap_err().is_validation());
        let args = ChatArgs {
            temperature: Some("warm".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).unwrap_err().is_validation());
    }

    #[test]
    fn config_from_args_rejects_unknown_model() {
        let args = ChatArgs {
            model: Some("claude-3-haiku-2024030".to_string()),
            ..ChatArgs::default()
        };
        let err = ChatConfig::try_from(args).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("claude-3-haiku-2024030"));
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_model(KnownModel::ClaudeSonnet4)
            .with_system_prompt("Test prompt")
            .with_max_tokens(2048)
            .with_temperature(0.5)
            .with_base_url("https://proxy.example.com/v1/")
            .without_color();

        assert_eq!(config.model, Model::Known(KnownModel::ClaudeSonnet4));
        assert_eq!(config.system_prompt.as_deref(), Some("Test prompt"));
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.temperature, 0.5);
        assert!(!config.use_color);
    }
}
