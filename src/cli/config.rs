//! Argument structs and resolved configuration for the `gemi` commands.

use std::path::PathBuf;
use std::sync::Arc;

use arrrg_derive::CommandLine;

use crate::client::{API_KEY_ENV, Gemini};
use crate::markdown::{MarkdownRenderer, MarkdownStyle, TerminalMarkdown};
use crate::render::PlainTextRenderer;
use crate::types::Model;
use crate::Result;

/// Flags accepted by every command.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    /// API key; falls back to `GEMINI_API_KEY`.
    #[arrrg(optional, "Gemini API key (or set GEMINI_API_KEY env var)", "KEY")]
    pub api_key: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Command-line arguments for `gemi generate`.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct GenerateArgs {
    #[arrrg(optional, "The prompt to send to Gemini", "PROMPT")]
    pub prompt: Option<String>,

    #[arrrg(optional, "Model to use (default: gemini-1.5-pro-latest)", "MODEL")]
    pub model: Option<String>,

    #[arrrg(optional, "Save the response to a file", "FILE")]
    pub output: Option<String>,

    #[arrrg(flag, "Stream the response as it's generated")]
    pub stream: bool,

    #[arrrg(flag, "List available Gemini models and exit")]
    pub list_models: bool,
}

/// Settings shared by every command.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfig {
    /// Explicit API key, if one was given on the command line.
    pub api_key: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Theme for rendered Markdown.
    pub style: MarkdownStyle,
}

impl GlobalConfig {
    pub fn new() -> Self {
        Self {
            api_key: None,
            use_color: true,
            style: MarkdownStyle::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_style(mut self, style: MarkdownStyle) -> Self {
        self.style = style;
        self
    }

    /// Disables ANSI color output, including in rendered Markdown.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// The Markdown theme after applying `--no-color`.
    pub fn markdown_style(&self) -> MarkdownStyle {
        if self.use_color {
            self.style
        } else {
            MarkdownStyle::NoTty
        }
    }

    pub fn markdown(&self) -> Arc<dyn MarkdownRenderer> {
        Arc::new(TerminalMarkdown::new(self.markdown_style()))
    }

    pub fn renderer(&self) -> PlainTextRenderer {
        PlainTextRenderer::with_color(self.use_color).with_markdown(self.markdown())
    }

    /// Returns true if a key was given or `GEMINI_API_KEY` is set.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || std::env::var(API_KEY_ENV).is_ok_and(|key| !key.is_empty())
    }

    /// Builds a client for `model`.  Fails with a configuration error when no
    /// API key is available.
    pub fn client(&self, model: Model) -> Result<Gemini> {
        Ok(Gemini::new(self.api_key.clone())?.with_model(model))
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<GlobalArgs> for GlobalConfig {
    fn from(args: GlobalArgs) -> Self {
        GlobalConfig {
            api_key: args.api_key.filter(|key| !key.is_empty()),
            use_color: !args.no_color,
            ..GlobalConfig::new()
        }
    }
}

/// Resolved settings for `gemi generate`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateConfig {
    /// The prompt; empty when none was given.
    pub prompt: String,
    pub model: Model,
    /// Where to save the raw response, when not streaming.
    pub output: Option<PathBuf>,
    pub stream: bool,
    pub list_models: bool,
}

impl From<GenerateArgs> for GenerateConfig {
    fn from(args: GenerateArgs) -> Self {
        GenerateConfig {
            prompt: args.prompt.unwrap_or_default(),
            model: args
                .model
                .filter(|name| !name.trim().is_empty())
                .map(|name| Model::from(name.as_str()))
                .unwrap_or_default(),
            output: args.output.filter(|path| !path.is_empty()).map(PathBuf::from),
            stream: args.stream,
            list_models: args.list_models,
        }
    }
}
