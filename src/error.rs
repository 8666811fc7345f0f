//! Error types for Tolk.

use thiserror::Error;

/// Library-level error type for Tolk operations.
#[derive(Error, Debug)]
pub enum TolkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported provider: {0}. Supported providers: anthropic, openai, openai-compatible")]
    UnsupportedProvider(String),

    #[error("{provider} API error: {message}")]
    Provider { provider: String, message: String },

    #[error("Invalid arguments for tool call '{tool}': {source}")]
    ArgumentDecode {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TolkError {
    /// Build a provider error from any displayable vendor failure.
    pub fn provider(provider: &str, err: impl std::fmt::Display) -> Self {
        TolkError::Provider {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for Tolk operations.
pub type Result<T> = std::result::Result<T, TolkError>;
