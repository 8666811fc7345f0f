//! Agent system: the tool-calling loop and the tools it can call.
//!
//! The runner drives an [`LlmProvider`](crate::llm::LlmProvider) against one
//! conversation, dispatching requested tools until the model answers or the
//! iteration limit is hit.

mod runner;
mod tools;

pub use runner::{Agent, AgentOutcome, AgentResponse, ToolCallRecord};
pub use tools::{
    tool_catalogue, ToolDispatcher, ToolExecutor, FETCH_URL, GET_YOUTUBE_INFO, SEARCH_WEB,
};
