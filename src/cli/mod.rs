//! The `gemi` command line.
//!
//! Global flags may appear anywhere on the command line; the first remaining
//! word selects the command and everything after it belongs to that command.
//! With no command a welcome screen is shown.

use std::str::FromStr;
use std::time::Duration;

use arrrg::CommandLine;
use indicatif::{ProgressBar, ProgressStyle};

use crate::chat::{ChatArgs, ChatConfig};
use crate::markdown::MarkdownStyle;
use crate::{Error, Result};

pub mod chat;
pub mod config;
pub mod generate;
pub mod models;
pub mod welcome;

pub use config::{GenerateArgs, GenerateConfig, GlobalArgs, GlobalConfig};

/// The version reported by `gemi version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "gemi [--api-key KEY] [--no-color] <chat|generate|models|version> [OPTIONS]";

/// The subcommands `gemi` understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Chat,
    Generate,
    Models,
    Version,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "chat" => Ok(Command::Chat),
            "generate" => Ok(Command::Generate),
            "models" => Ok(Command::Models),
            "version" => Ok(Command::Version),
            _ => Err(Error::validation(
                format!("unknown command {s:?}; usage: {USAGE}"),
                Some("command".to_string()),
            )),
        }
    }
}

/// A command line split into global flags, the command word and the
/// command's own arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub global: Vec<String>,
    pub command: Option<String>,
    pub rest: Vec<String>,
}

/// Splits `args` (without the program name).
///
/// `--api-key KEY`, `--api-key=KEY` and `--no-color` are pulled out wherever
/// they appear.  A trailing `--api-key` with no value is kept as a global
/// argument so that the flag parser reports it.
pub fn split_arguments<S: AsRef<str>>(args: &[S]) -> Invocation {
    let mut invocation = Invocation::default();
    let mut iter = args.iter().map(AsRef::as_ref);
    while let Some(arg) = iter.next() {
        if arg == "--no-color" || arg.starts_with("--api-key=") {
            invocation.global.push(arg.to_string());
        } else if arg == "--api-key" {
            invocation.global.push(arg.to_string());
            if let Some(value) = iter.next() {
                invocation.global.push(value.to_string());
            }
        } else if invocation.command.is_none() && !arg.starts_with('-') {
            invocation.command = Some(arg.to_string());
        } else {
            invocation.rest.push(arg.to_string());
        }
    }
    invocation
}

/// Runs the command line `args` (without the program name).
pub async fn run<S: AsRef<str>>(args: &[S]) -> Result<()> {
    let invocation = split_arguments(args);

    let global: Vec<&str> = invocation.global.iter().map(String::as_str).collect();
    let (global, extra) = GlobalArgs::from_arguments_relaxed(USAGE, &global);
    reject_extra("gemi", &extra)?;
    let global = GlobalConfig::from(global).with_style(MarkdownStyle::from_env()?);

    let Some(command) = invocation.command else {
        let mut renderer = global.renderer();
        welcome::welcome(&mut renderer, global.has_api_key());
        return Ok(());
    };
    let command: Command = command.parse()?;
    tracing::debug!(?command, "dispatching command");

    let rest: Vec<&str> = invocation.rest.iter().map(String::as_str).collect();
    match command {
        Command::Chat => {
            let (args, extra) = ChatArgs::from_arguments_relaxed("gemi chat [OPTIONS]", &rest);
            reject_extra("chat", &extra)?;
            let mut config = ChatConfig::from(args);
            if !global.use_color {
                config = config.without_color();
            }
            chat::run(&global, config).await
        }
        Command::Generate => {
            let (args, extra) =
                GenerateArgs::from_arguments_relaxed("gemi generate [OPTIONS]", &rest);
            reject_extra("generate", &extra)?;
            generate::run(&global, GenerateConfig::from(args)).await
        }
        Command::Models => {
            reject_extra("models", &invocation.rest)?;
            models::run(&global).await
        }
        Command::Version => {
            reject_extra("version", &invocation.rest)?;
            welcome::version(&mut global.renderer());
            Ok(())
        }
    }
}

fn reject_extra<S: AsRef<str>>(command: &str, extra: &[S]) -> Result<()> {
    if extra.is_empty() {
        return Ok(());
    }
    let extra: Vec<&str> = extra.iter().map(AsRef::as_ref).collect();
    Err(Error::validation(
        format!("unexpected arguments for {command}: {}", extra.join(" ")),
        None,
    ))
}

/// A spinner on stderr shown while waiting on the network.
pub(crate) fn spinner(prefix: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.cyan}{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_prefix(prefix.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
