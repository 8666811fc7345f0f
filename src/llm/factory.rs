//! Provider selection from configuration.

use super::{AnthropicProvider, LlmProvider, OpenAIProvider};
use crate::config::LlmSettings;
use crate::error::{Result, TolkError};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Supported vendor families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAI,
    OpenAICompatible,
}

impl std::str::FromStr for ProviderKind {
    type Err = TolkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAI),
            "openai-compatible" | "openai_compatible" => Ok(ProviderKind::OpenAICompatible),
            _ => Err(TolkError::UnsupportedProvider(s.to_string())),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenAI => write!(f, "openai"),
            ProviderKind::OpenAICompatible => write!(f, "openai-compatible"),
        }
    }
}

/// Capability flags the caller may force on a provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityOverrides {
    /// Force tool calling on or off. `None` keeps the provider's default.
    pub supports_tools: Option<bool>,
}

/// Default model for each vendor when none is configured.
pub fn default_model(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Anthropic => "claude-3-5-sonnet-20241022",
        ProviderKind::OpenAI | ProviderKind::OpenAICompatible => "gpt-4o",
    }
}

/// Select and construct the adapter for a vendor.
pub fn select_provider(
    vendor_id: &str,
    credential: &str,
    model: Option<&str>,
    endpoint: Option<&str>,
    overrides: CapabilityOverrides,
    timeout: Duration,
) -> Result<Arc<dyn LlmProvider>> {
    let kind: ProviderKind = vendor_id.parse()?;

    if credential.trim().is_empty() {
        return Err(TolkError::Config(
            "LLM API key is required (set llm.api_key or LLM_API_KEY)".to_string(),
        ));
    }

    let model = model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| default_model(kind));
    let endpoint = endpoint.filter(|e| !e.trim().is_empty());

    let provider: Arc<dyn LlmProvider> = match kind {
        ProviderKind::Anthropic => {
            let mut provider = AnthropicProvider::new(credential, model, timeout)?;
            if let Some(url) = endpoint {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        ProviderKind::OpenAI => Arc::new(OpenAIProvider::new(credential, model, endpoint, timeout)?),
        ProviderKind::OpenAICompatible => {
            let base_url = endpoint.ok_or_else(|| {
                TolkError::Config("base_url is required for openai-compatible provider".to_string())
            })?;
            let supports_tools = overrides
                .supports_tools
                .unwrap_or_else(|| default_tool_support(base_url));
            Arc::new(OpenAIProvider::compatible(
                credential,
                model,
                base_url,
                supports_tools,
                timeout,
            )?)
        }
    };

    info!(
        "Initialized LLM provider: {} with model: {} (tools: {})",
        provider.name(),
        provider.model(),
        provider.supports_tool_calling()
    );

    Ok(provider)
}

/// Build the adapter described by the `[llm]` settings section.
pub fn create_provider(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>> {
    select_provider(
        &settings.provider,
        settings.api_key.as_deref().unwrap_or_default(),
        settings.model.as_deref(),
        settings.base_url.as_deref(),
        CapabilityOverrides {
            supports_tools: settings.supports_tools,
        },
        Duration::from_secs(settings.timeout_secs),
    )
}

/// Groq advertises function calling but its support is unreliable.
fn default_tool_support(base_url: &str) -> bool {
    !base_url.contains("groq.com")
}
