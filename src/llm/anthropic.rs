//! Anthropic Messages API adapter.

use super::{LlmProvider, LlmResponse, Message, Role, ToolCall, ToolDescriptor, Usage};
use crate::error::{Result, TolkError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Adapter for Anthropic-shaped endpoints.
pub struct AnthropicProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    /// Create a new adapter against the public Anthropic endpoint.
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TolkError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the adapter at a different Anthropic-compatible host.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [Message],
        tools: Option<&'a [ToolDescriptor]>,
        max_tokens: u32,
        temperature: f32,
    ) -> MessagesRequest<'a> {
        let (system, messages) = split_system(messages);
        MessagesRequest {
            model: &self.model,
            max_tokens,
            temperature,
            system,
            messages,
            tools: tools.filter(|t| !t.is_empty()),
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    #[instrument(skip(self, messages, tools), fields(model = %self.model, messages = messages.len()))]
    async fn generate(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDescriptor]>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, tools, max_tokens, temperature);

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Anthropic API error: {}", e);
                TolkError::provider("Anthropic", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Anthropic API error: {} {}", status, body);
            return Err(TolkError::provider("Anthropic", format!("{}: {}", status, body)));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| TolkError::provider("Anthropic", format!("Invalid response body: {}", e)))?;

        let normalized = normalize_response(body);
        debug!(
            "Anthropic response: {} chars, {} tool calls",
            normalized.content.len(),
            normalized.tool_calls.len()
        );
        Ok(normalized)
    }

    fn supports_tool_calling(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Lift system messages into the separate `system` field.
///
/// System text is joined with a blank line; every other message keeps its order.
fn split_system(messages: &[Message]) -> (Option<String>, Vec<WireMessage<'_>>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.is_system())
        .map(|m| m.content.as_str())
        .collect();

    let conversation = messages
        .iter()
        .filter(|m| !m.is_system())
        .map(|m| WireMessage {
            role: m.role,
            content: &m.content,
        })
        .collect();

    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };

    (system, conversation)
}

/// Map a Messages API response onto the canonical model.
fn normalize_response(response: MessagesResponse) -> LlmResponse {
    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block {
            ContentBlock::Text { text } => content.push_str(&text),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments: input,
                });
            }
            ContentBlock::Other => {}
        }
    }

    LlmResponse {
        content,
        tool_calls,
        finish_reason: response.stop_reason,
        usage: Usage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        },
    }
}

// === Wire types ===

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDescriptor]>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Map<String, serde_json::Value>,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new("test-key", "claude-3-5-sonnet-20241022", Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_split_system_joins_with_blank_line() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::system("Be brief."),
            Message::user("Hi"),
            Message::assistant("Hello!"),
        ];

        let (system, rest) = split_system(&messages);
        assert_eq!(system.as_deref(), Some("You are helpful.\n\nBe brief."));
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].role, Role::User);
        assert_eq!(rest[1].content, "Hello!");
    }

    #[test]
    fn test_split_system_without_system_messages() {
        let messages = vec![Message::user("Hi")];
        let (system, rest) = split_system(&messages);
        assert!(system.is_none());
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_request_shape() {
        let provider = provider();
        let messages = vec![Message::system("sys"), Message::user("question")];
        let tools = vec![ToolDescriptor {
            name: "search_web".to_string(),
            description: "Search".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        }];

        let request = provider.build_request(&messages, Some(&tools), 1024, 0.5);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["system"], "sys");
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["tools"][0]["name"], "search_web");
        assert_eq!(json["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn test_request_omits_tools_when_none() {
        let provider = provider();
        let messages = vec![Message::user("question")];
        let json = serde_json::to_value(provider.build_request(&messages, None, 10, 0.7)).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_normalize_text_and_tool_use() {
        let body: MessagesResponse = serde_json::from_value(serde_json::json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Let me "},
                {"type": "text", "text": "search."},
                {"type": "tool_use", "id": "toolu_01", "name": "search_web", "input": {"query": "rust ownership"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 42, "output_tokens": 7}
        }))
        .unwrap();

        let response = normalize_response(body);
        assert_eq!(response.content, "Let me search.");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, "toolu_01");
        assert_eq!(response.tool_calls[0].arguments["query"], "rust ownership");
        assert_eq!(response.finish_reason.as_deref(), Some("tool_use"));
        assert_eq!(response.usage, Usage { input_tokens: 42, output_tokens: 7 });
    }

    #[test]
    fn test_normalize_ignores_unknown_blocks() {
        let body: MessagesResponse = serde_json::from_value(serde_json::json!({
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "x"},
                {"type": "text", "text": "Answer"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }))
        .unwrap();

        let response = normalize_response(body);
        assert_eq!(response.content, "Answer");
        assert!(!response.is_tool_request());
    }
}
