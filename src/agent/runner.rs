//! Agent runner with tool calling loop.

use super::tools::{tool_catalogue, ToolExecutor};
use crate::conversation::Conversation;
use crate::error::Result;
use crate::llm::{LlmProvider, Message, ToolCall, ToolDescriptor, Usage};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Agent that answers a conversation, calling tools as the model requests.
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolExecutor>,
    catalogue: Vec<ToolDescriptor>,
    max_iterations: usize,
    max_tokens: u32,
    temperature: f32,
}

impl Agent {
    /// Create a new agent over a provider and a tool executor.
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<dyn ToolExecutor>) -> Self {
        Self {
            provider,
            tools,
            catalogue: tool_catalogue(),
            max_iterations: 5,
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    /// Set maximum LLM calls per run.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set token limit and temperature for every LLM call.
    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Run the tool loop until the model answers or iterations run out.
    ///
    /// Tool turns and the final answer are appended to `conversation`.
    /// Provider and argument-decode errors abort the run; whatever was
    /// appended before the failure stays in the conversation.
    pub async fn run(&self, conversation: &mut Conversation) -> Result<AgentResponse> {
        let tools = self
            .provider
            .supports_tool_calling()
            .then_some(self.catalogue.as_slice());

        let mut tool_calls_made = Vec::new();
        let mut usage = Usage::default();

        for iteration in 1..=self.max_iterations {
            debug!("Agent iteration {}", iteration);

            let response = self
                .provider
                .generate(
                    conversation.messages(),
                    tools,
                    self.max_tokens,
                    self.temperature,
                )
                .await?;
            usage += response.usage;

            if response.is_tool_request() {
                for call in &response.tool_calls {
                    let record = self.execute_tool_call(call, &response.content).await;
                    conversation.push(Message::assistant(record.placeholder.clone()));
                    conversation.push(Message::user(format!(
                        "[Tool result for {}]\n{}",
                        record.name, record.result
                    )));
                    tool_calls_made.push(record);
                }
                continue;
            }

            if response.content.trim().is_empty() {
                warn!("Empty response from {} after {} iterations", self.provider.name(), iteration);
                return Ok(AgentResponse {
                    outcome: AgentOutcome::Empty,
                    tool_calls: tool_calls_made,
                    iterations: iteration,
                    usage,
                });
            }

            conversation.push(Message::assistant(response.content.clone()));
            return Ok(AgentResponse {
                outcome: AgentOutcome::Answer(response.content),
                tool_calls: tool_calls_made,
                iterations: iteration,
                usage,
            });
        }

        warn!("Agent exhausted {} iterations", self.max_iterations);
        Ok(AgentResponse {
            outcome: AgentOutcome::Exhausted,
            tool_calls: tool_calls_made,
            iterations: self.max_iterations,
            usage,
        })
    }

    /// Execute a single tool call and return a record of it.
    async fn execute_tool_call(&self, call: &ToolCall, content: &str) -> ToolCallRecord {
        let arguments = serde_json::Value::Object(call.arguments.clone()).to_string();
        info!("Agent calling tool: {} with args: {}", call.name, arguments);

        let placeholder = if content.trim().is_empty() {
            format!("[Using tool: {}]", call.name)
        } else {
            content.to_string()
        };

        let result = self.tools.execute(&call.name, &call.arguments).await;

        ToolCallRecord {
            name: call.name.clone(),
            arguments,
            placeholder,
            result,
        }
    }
}

/// How an agent run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    /// The model produced a final answer.
    Answer(String),
    /// The model returned neither text nor tool calls.
    Empty,
    /// The iteration limit was reached while the model still requested tools.
    Exhausted,
}

impl AgentOutcome {
    /// Short label for logs and API responses.
    pub fn label(&self) -> &'static str {
        match self {
            AgentOutcome::Answer(_) => "answer",
            AgentOutcome::Empty => "empty",
            AgentOutcome::Exhausted => "exhausted",
        }
    }
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    pub outcome: AgentOutcome,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
    /// Tokens summed over all LLM calls.
    pub usage: Usage,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Assistant turn recorded ahead of the result.
    pub placeholder: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
