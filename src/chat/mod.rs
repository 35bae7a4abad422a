//! Chat application module for interactive conversations with Gemini.
//!
//! This module provides the state machine behind the `gemi chat` REPL. It
//! supports:
//!
//! - Multi-turn conversations against a [`GenerativeBackend`](crate::GenerativeBackend)
//! - Slash commands for switching and listing models
//! - A single outstanding request per session
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: the session state machine and its transcript
//! - [`commands`]: slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use session::{Action, ChatMessage, ChatSession, Origin, SessionState};
