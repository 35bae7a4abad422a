//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use arrrg_derive::CommandLine;

use crate::types::Model;

/// Command-line arguments for `gemi chat`.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gemini-1.5-pro-latest)", "MODEL")]
    pub model: Option<String>,

    /// List the available models and exit.
    #[arrrg(flag, "List available Gemini models and exit")]
    pub list_models: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to start the conversation with.
    pub model: Model,

    /// Whether to list models instead of chatting.
    pub list_models: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-1.5-pro-latest
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            list_models: false,
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
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

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let model = args
            .model
            .filter(|name| !name.trim().is_empty())
            .map(|name| Model::from(name.as_str()))
            .unwrap_or_default();

        ChatConfig {
            model,
            list_models: args.list_models,
            ..ChatConfig::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model, Model::Known(KnownModel::Gemini15ProLatest));
        assert!(config.use_color);
        assert!(!config.list_models);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from(ChatArgs::default());
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("models/gemini-2.5-flash".to_string()),
            list_models: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.model, Model::Known(KnownModel::Gemini25Flash));
        assert!(config.list_models);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_model(Model::Custom("gemini-exp-1206".to_string()))
            .without_color();
        assert_eq!(config.model.id(), "gemini-exp-1206");
        assert!(!config.use_color);
    }
}
