//! Chat application module for interactive conversations with Claude.
//!
//! This module provides a streaming REPL chat interface built on top of the
//! colloquy client library. It supports:
//!
//! - Streaming responses with real-time token display
//! - File attachments queued for the next message
//! - Mermaid diagrams surfaced after each response
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Conversation state and API interaction
//! - [`commands`]: Slash command parsing
//! - [`render`]: Terminal output

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_MAX_TOKENS};
pub use render::{PlainTextRenderer, Renderer};
pub use session::ChatSession;
