//! Configuration settings for Tolk.

use super::Prompts;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub chat: ChatSettings,
    pub tools: ToolSettings,
    pub server: ServerSettings,
    pub prompts: Prompts,
}

/// LLM provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider family (anthropic, openai, openai-compatible).
    pub provider: String,
    /// API key. Usually supplied through `LLM_API_KEY` instead.
    pub api_key: Option<String>,
    /// Model id. None = the provider's default model.
    pub model: Option<String>,
    /// Base URL, required for openai-compatible providers.
    pub base_url: Option<String>,
    /// Force tool calling on or off. None = provider default.
    pub supports_tools: Option<bool>,
    /// Maximum tokens per response.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            api_key: None,
            model: None,
            base_url: None,
            supports_tools: None,
            max_tokens: 4096,
            temperature: 0.7,
            timeout_secs: 300,
        }
    }
}

/// Conversation and agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Maximum messages kept per conversation.
    pub max_history: usize,
    /// Maximum LLM calls per user message.
    pub max_iterations: usize,
    /// Fetch video info for video links in user messages before answering.
    pub auto_video_context: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_history: 20,
            max_iterations: 5,
            auto_video_context: true,
        }
    }
}

/// Tool backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Search engine (duckduckgo, brave, tavily).
    pub search_engine: String,
    /// Number of search results handed to the model.
    pub max_results: usize,
    /// Brave Search API key.
    pub brave_api_key: Option<String>,
    /// Tavily API key.
    pub tavily_api_key: Option<String>,
    /// Page fetch timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// Maximum characters of page text handed to the model.
    pub max_page_chars: usize,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            search_engine: "duckduckgo".to_string(),
            max_results: 5,
            brave_api_key: None,
            tavily_api_key: None,
            fetch_timeout_secs: 10,
            max_page_chars: 8000,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file, then the environment.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// A `.env` file in the working directory is loaded first; environment
    /// variables override values from the file.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = match path {
            Some(p) => Self::expand_path(&p.to_string_lossy()),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LLM_PROVIDER") {
            self.llm.provider = v.to_lowercase();
        }
        if let Some(v) = get("LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = Some(v);
        }
        if let Some(v) = get("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Some(v) = get("LLM_SUPPORTS_TOOLS") {
            match v.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.llm.supports_tools = Some(true),
                "0" | "false" | "no" => self.llm.supports_tools = Some(false),
                other => warn!("Ignoring LLM_SUPPORTS_TOOLS={}", other),
            }
        }
        if let Some(v) = get("SEARCH_ENGINE") {
            self.tools.search_engine = v.to_lowercase();
        }
        if let Some(v) = get("BRAVE_API_KEY") {
            self.tools.brave_api_key = Some(v);
        }
        if let Some(v) = get("TAVILY_API_KEY") {
            self.tools.tavily_api_key = Some(v);
        }
        if let Some(v) = get("MAX_HISTORY_MESSAGES") {
            match v.trim().parse() {
                Ok(n) => self.chat.max_history = n,
                Err(_) => warn!("Ignoring MAX_HISTORY_MESSAGES={}", v),
            }
        }
        if let Some(v) = get("MAX_ITERATIONS") {
            match v.trim().parse() {
                Ok(n) => self.chat.max_iterations = n,
                Err(_) => warn!("Ignoring MAX_ITERATIONS={}", v),
            }
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TolkError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tolk")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Settings with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |key: &Option<String>| key.as_ref().map(|_| "********".to_string());
        let mut copy = self.clone();
        copy.llm.api_key = mask(&self.llm.api_key);
        copy.tools.brave_api_key = mask(&self.tools.brave_api_key);
        copy.tools.tavily_api_key = mask(&self.tools.tavily_api_key);
        copy
    }
}
