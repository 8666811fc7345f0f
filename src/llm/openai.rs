//! OpenAI chat-completions adapter.
//!
//! Also serves OpenAI-compatible endpoints (Groq, Together, Nebius, vLLM, ...)
//! via a custom API base and an explicit tool-support switch.

use super::{LlmProvider, LlmResponse, Message, Role, ToolCall, ToolDescriptor, Usage};
use crate::error::{Result, TolkError};
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, CreateChatCompletionResponse, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Adapter for OpenAI and OpenAI-compatible endpoints.
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    model: String,
    name: &'static str,
    supports_tools: bool,
}

impl OpenAIProvider {
    /// Create an adapter for the OpenAI API, optionally against a custom base URL.
    pub fn new(api_key: &str, model: &str, api_base: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = api_base.filter(|b| !b.is_empty()) {
            config = config.with_api_base(base);
        }

        Ok(Self {
            client: create_client(config, timeout)?,
            model: model.to_string(),
            name: "openai",
            supports_tools: true,
        })
    }

    /// Create an adapter for an OpenAI-compatible endpoint.
    ///
    /// `supports_tools` forces tool calling off for endpoints that advertise
    /// function calling but do not implement it reliably.
    pub fn compatible(
        api_key: &str,
        model: &str,
        base_url: &str,
        supports_tools: bool,
        timeout: Duration,
    ) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(TolkError::Config(
                "base_url is required for OpenAI-compatible providers".to_string(),
            ));
        }

        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);

        info!("Initialized OpenAI-compatible provider with base_url: {}", base_url);

        Ok(Self {
            client: create_client(config, timeout)?,
            model: model.to_string(),
            name: "openai-compatible",
            supports_tools,
        })
    }

    #[allow(deprecated)]
    fn build_request(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDescriptor]>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<CreateChatCompletionRequest> {
        let wire_messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(wire_messages)
            .max_tokens(max_tokens)
            .temperature(temperature);

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            builder.tools(tool_definitions(tools));
        }

        builder
            .build()
            .map_err(|e| TolkError::provider(self.name, format!("Failed to build request: {}", e)))
    }
}

/// Create an OpenAI client with the given config and request timeout.
fn create_client(config: OpenAIConfig, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TolkError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(config).with_http_client(http_client))
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    #[instrument(skip(self, messages, tools), fields(provider = self.name, model = %self.model, messages = messages.len()))]
    async fn generate(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDescriptor]>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, tools, max_tokens, temperature)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            error!("{} API error: {}", self.name, e);
            TolkError::provider(self.name, e)
        })?;

        let normalized = normalize_response(response)?;
        debug!(
            "{} response: {} chars, {} tool calls",
            self.name,
            normalized.content.len(),
            normalized.tool_calls.len()
        );
        Ok(normalized)
    }

    fn supports_tool_calling(&self) -> bool {
        self.supports_tools
    }

    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Convert a canonical message into the request message type.
fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let content = message.content.clone();
    let built: std::result::Result<ChatCompletionRequestMessage, OpenAIError> = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map(Into::into),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map(Into::into),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map(Into::into),
    };

    built.map_err(|e| TolkError::provider("openai", format!("Failed to build message: {}", e)))
}

/// Wrap tool descriptors in the `{type: "function", function: ...}` envelope.
fn tool_definitions(tools: &[ToolDescriptor]) -> Vec<ChatCompletionTool> {
    tools
        .iter()
        .map(|tool| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                parameters: Some(tool.input_schema.clone()),
                strict: None,
            },
        })
        .collect()
}

/// Map the first completion choice onto the canonical model.
///
/// Tool-call arguments arrive as JSON text; malformed arguments fail the whole
/// response rather than dropping the call.
fn normalize_response(response: CreateChatCompletionResponse) -> Result<LlmResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TolkError::provider("openai", "No choices in response"))?;

    let mut tool_calls = Vec::new();
    for call in choice.message.tool_calls.unwrap_or_default() {
        let arguments = serde_json::from_str(&call.function.arguments).map_err(|source| {
            TolkError::ArgumentDecode {
                tool: call.function.name.clone(),
                source,
            }
        })?;

        tool_calls.push(ToolCall {
            id: call.id,
            name: call.function.name,
            arguments,
        });
    }

    let finish_reason = choice
        .finish_reason
        .and_then(|reason| serde_json::to_value(reason).ok())
        .and_then(|value| value.as_str().map(str::to_string));

    let usage = response
        .usage
        .map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        finish_reason,
        usage,
    })
}
