//! A terminal client for Google's Gemini generative language API.
//!
//! The crate is layered:
//!
//! - [`client`] speaks the REST API, including server-sent-event streaming;
//! - [`backend`] is the trait the front end is written against;
//! - [`chat`] is the chat session state machine;
//! - [`markdown`], [`render`] and [`accumulating_stream`] turn replies into
//!   terminal output;
//! - [`cli`] wires everything into the `gemi` commands.

// Public modules
pub mod accumulating_stream;
pub mod backend;
pub mod catalog;
pub mod chat;
pub mod cli;
pub mod client;
pub mod error;
pub mod markdown;
pub mod render;
pub mod sse;
pub mod types;

mod observability;

// Re-exports
pub use accumulating_stream::AccumulatingStream;
pub use backend::{Conversation, GenerativeBackend};
pub use client::Gemini;
pub use error::{Error, Result};
pub use markdown::{MarkdownRenderer, MarkdownStyle, TerminalMarkdown};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use types::*;
