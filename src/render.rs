//! Output rendering for the chat REPL and the one-shot commands.
//!
//! This module provides the renderer trait and a plain-text implementation
//! that styles status lines with ANSI colours and sends Markdown bodies
//! through a [`MarkdownRenderer`].

use std::io::{self, Write};
use std::sync::Arc;

use crate::markdown::{MarkdownRenderer, TerminalMarkdown};

/// ANSI escape code for bright green text (success lines).
const ANSI_GREEN: &str = "\x1b[92m";

/// ANSI escape code for bright cyan text (info lines).
const ANSI_CYAN: &str = "\x1b[96m";

/// ANSI escape code for bright yellow text (warnings).
const ANSI_YELLOW: &str = "\x1b[93m";

/// ANSI escape code for bright red text (errors).
const ANSI_RED: &str = "\x1b[91m";

/// ANSI escape code for the assistant label.
const ANSI_ASSISTANT: &str = "\x1b[38;5;75m";

/// ANSI escape code for the title banner.
const ANSI_TITLE: &str = "\x1b[1;97;48;5;99m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

pub const SUCCESS_PREFIX: &str = "✓ ";
pub const INFO_PREFIX: &str = "ℹ ";
pub const WARNING_PREFIX: &str = "⚠ ";
pub const ERROR_PREFIX: &str = "✗ ";
pub const USER_LABEL: &str = "You: ";
pub const ASSISTANT_LABEL: &str = "Gemini: ";

/// Trait for rendering user-visible output.
///
/// This abstraction allows for different rendering strategies, such as ANSI
/// styled output for a terminal or unstyled output when piping.
pub trait Renderer: Send {
    /// Print a banner line.
    fn print_title(&mut self, title: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print a success message.
    fn print_success(&mut self, message: &str);

    /// Print a warning.
    fn print_warning(&mut self, message: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print a line verbatim.
    fn print_line(&mut self, text: &str);

    /// Print a reply from the model, rendering it as Markdown.
    fn print_assistant(&mut self, text: &str);

    /// Print a Markdown document without a label.
    fn print_markdown(&mut self, text: &str);

    /// Called when a stream is interrupted by the user.
    fn print_interrupted(&mut self) {}
}

/// Render `text` as Markdown, degrading to the raw text on failure.
///
/// A failure produces a one-line error notice followed by the unrendered
/// text, so the content is never lost.
pub fn format_markdown(markdown: &dyn MarkdownRenderer, text: &str, use_color: bool) -> String {
    match markdown.render(text) {
        Ok(rendered) => rendered,
        Err(err) => {
            tracing::warn!(error = %err, "markdown rendering failed");
            format!("{}{err}\n{text}", paint(use_color, ANSI_RED, ERROR_PREFIX))
        }
    }
}

fn paint(use_color: bool, color: &str, text: &str) -> String {
    if use_color {
        format!("{color}{text}{ANSI_RESET}")
    } else {
        text.to_string()
    }
}

/// Plain text renderer with optional ANSI styling.
///
/// Output goes to stdout unless another writer is supplied; errors always go
/// to the same writer so that the transcript stays in order.
pub struct PlainTextRenderer {
    out: Box<dyn Write + Send>,
    markdown: Arc<dyn MarkdownRenderer>,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            out: Box::new(io::stdout()),
            markdown: Arc::new(TerminalMarkdown::default()),
            use_color,
        }
    }

    /// Sends output to `out` instead of stdout.
    pub fn with_writer(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    /// Uses `markdown` for assistant replies and documents.
    pub fn with_markdown(mut self, markdown: Arc<dyn MarkdownRenderer>) -> Self {
        self.markdown = markdown;
        self
    }

    /// The Markdown renderer this renderer uses.
    pub fn markdown(&self) -> Arc<dyn MarkdownRenderer> {
        Arc::clone(&self.markdown)
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }

    fn prefixed(&mut self, color: &str, prefix: &str, text: &str) {
        let line = format!("{}{text}", paint(self.use_color, color, prefix));
        self.line(&line);
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_title(&mut self, title: &str) {
        let title = paint(self.use_color, ANSI_TITLE, &format!("   {title}   "));
        self.line(&title);
    }

    fn print_info(&mut self, info: &str) {
        self.prefixed(ANSI_CYAN, INFO_PREFIX, info);
    }

    fn print_success(&mut self, message: &str) {
        self.prefixed(ANSI_GREEN, SUCCESS_PREFIX, message);
    }

    fn print_warning(&mut self, message: &str) {
        self.prefixed(ANSI_YELLOW, WARNING_PREFIX, message);
    }

    fn print_error(&mut self, error: &str) {
        self.prefixed(ANSI_RED, ERROR_PREFIX, error);
    }

    fn print_line(&mut self, text: &str) {
        self.line(text);
    }

    fn print_assistant(&mut self, text: &str) {
        let label = paint(self.use_color, ANSI_ASSISTANT, ASSISTANT_LABEL);
        let body = format_markdown(self.markdown.as_ref(), text, self.use_color);
        self.line(&label);
        self.line(&body);
    }

    fn print_markdown(&mut self, text: &str) {
        let body = format_markdown(self.markdown.as_ref(), text, self.use_color);
        self.line(&body);
    }

    fn print_interrupted(&mut self) {
        self.line("\n[interrupted]");
    }
}
