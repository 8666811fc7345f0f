//! Configuration module for Tolk.
//!
//! Handles loading settings from TOML, `.env` and the environment, plus the
//! fixed prompt and reply texts.

mod prompts;
mod settings;

pub use prompts::Prompts;
pub use settings::{
    ChatSettings, LlmSettings, ServerSettings, Settings, ToolSettings,
};
