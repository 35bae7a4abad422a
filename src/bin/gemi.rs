//! Terminal client for the Gemini API.
//!
//! # Usage
//!
//! ```bash
//! # Show the welcome screen
//! gemi
//!
//! # Chat interactively
//! gemi chat --model gemini-2.5-flash
//!
//! # One-shot generation, streamed as it arrives
//! gemi generate --prompt "Explain server-sent events" --stream
//!
//! # Save a reply to a file
//! gemi generate --prompt "Write a haiku" --output haiku.md
//!
//! # List models
//! gemi models
//! ```
//!
//! The API key comes from `--api-key` or `GEMINI_API_KEY`.  Logging is
//! controlled by `GEMI_LOG` (default `warn`) and the Markdown theme by
//! `GEMI_STYLE` (`dark`, `light` or `notty`).

use tracing_subscriber::EnvFilter;

use gemi::render::ERROR_PREFIX;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_env("GEMI_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = gemi::cli::run(&args).await {
        eprintln!("{ERROR_PREFIX}{err}");
        std::process::exit(1);
    }
}
