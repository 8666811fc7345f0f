//! Tolk - an LLM chat assistant with tools
//!
//! Tolk answers chat messages with an LLM that can search the web, read web
//! pages and look up YouTube videos while it thinks.
//!
//! The name "Tolk" is Scandinavian for "interpreter."
//!
//! # Overview
//!
//! Each inbound message runs a bounded tool-calling loop:
//! - The conversation history is sent to the configured provider
//! - Requested tools are executed and their results appended as chat turns
//! - The loop ends with an answer, an empty response, or after `max_iterations` calls
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `llm` - Provider adapters (Anthropic, OpenAI, OpenAI-compatible) and the factory
//! - `conversation` - Bounded per-conversation message history
//! - `tools` - Web search, page fetch and video collaborators
//! - `agent` - Tool dispatch and the tool-calling loop
//! - `orchestrator` - Per-message coordination shared by all transports
//! - `cli` - Terminal chat, one-shot ask and the HTTP server
//!
//! # Example
//!
//! ```rust,no_run
//! use tolk::config::Settings;
//! use tolk::conversation::ConversationId;
//! use tolk::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     let reply = orchestrator
//!         .reply(&ConversationId::from("demo"), "What's new in Rust 1.80?")
//!         .await;
//!     println!("{}", reply);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod tools;

pub use error::{Result, TolkError};
