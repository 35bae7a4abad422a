//! The screens shown for `gemi` with no command and for `gemi version`.

use crate::cli::VERSION;
use crate::render::Renderer;

const COMMANDS: &[(&str, &str)] = &[
    ("chat", "Start an interactive chat with Gemini AI"),
    ("generate", "Generate text with Gemini AI"),
    ("models", "List available Gemini models"),
    ("version", "Display version information"),
];

/// Greets the user and lists the commands.  Warns when no API key is set.
pub fn welcome(renderer: &mut dyn Renderer, has_api_key: bool) {
    renderer.print_title("Welcome to Gemi CLI");
    renderer.print_success("Gemi is ready to use!");
    renderer.print_info("Available commands:");
    for (name, summary) in COMMANDS {
        renderer.print_line(&format!("  gemi {name:<9}- {summary}"));
    }
    if !has_api_key {
        renderer.print_warning("No API key found. Please set your Gemini API key using:");
        renderer.print_line("  - The --api-key flag");
        renderer.print_line("  - Or the GEMINI_API_KEY environment variable");
    }
}

pub fn version(renderer: &mut dyn Renderer) {
    renderer.print_info(&format!("Gemi CLI version {VERSION}"));
}
