//! Provider-agnostic LLM layer.
//!
//! Every vendor adapter maps its own wire shape onto the canonical
//! [`Message`] / [`LlmResponse`] model defined here, so the agent loop never
//! sees vendor-specific types.

mod anthropic;
mod factory;
mod openai;

pub use anthropic::AnthropicProvider;
pub use factory::{create_provider, default_model, select_provider, CapabilityOverrides, ProviderKind};
pub use openai::OpenAIProvider;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A chat message with role and content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

/// A tool invocation requested by the model.
///
/// Only adapters construct these; `id` is vendor-issued and passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

/// Token accounting for a single generate call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Normalized response from any provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Text content (may be empty).
    pub content: String,
    /// Requested tool calls, in the order the model returned them.
    pub tool_calls: Vec<ToolCall>,
    /// Vendor stop/finish reason, passed through as-is.
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

impl LlmResponse {
    /// A response is either final or tool-requesting, never both.
    pub fn is_tool_request(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Static description of a tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Trait implemented by every vendor adapter.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a response for the given conversation.
    ///
    /// `tools` is `None` when tool calling should not be offered at all.
    async fn generate(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDescriptor]>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<LlmResponse>;

    /// Whether this provider instance may be offered tools. Fixed at construction.
    fn supports_tool_calling(&self) -> bool;

    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Model identifier in use.
    fn model(&self) -> &str;
}
