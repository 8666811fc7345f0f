//! Prompt and reply templates for Tolk.

use serde::{Deserialize, Serialize};

/// System prompt and fixed user-facing texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// System message that opens every new conversation.
    pub system: String,
    /// Greeting shown by the `/start` command.
    pub greeting: String,
    /// Reply when the model returns neither text nor tool calls.
    pub empty_response: String,
    /// Reply when the tool loop runs out of iterations.
    pub exhausted: String,
    /// Reply when anything fails while handling a message.
    pub failure: String,
    /// Confirmation after a conversation reset.
    pub reset: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            system: "You are a helpful AI assistant in a chat. \
                You can search the web, fetch web pages, and analyze YouTube videos. \
                When asked to verify claims, provide context, suggest alternatives, or explain simply, \
                use the available tools to gather accurate information. \
                Be concise but thorough in your responses."
                .to_string(),

            greeting: r#"Hello! I'm an AI assistant powered by LLMs.

I can:
- Answer questions and have conversations
- Search the web for information
- Fetch and analyze web pages
- Extract information from YouTube videos
- Verify claims and provide context

Try asking me to:
• 'verify claims' - fact-check statements
• 'provide context' - get background info
• 'suggest alternatives' - explore different explanations
• 'explain simply' or 'eli5' - simplify complex topics"#
                .to_string(),

            empty_response: "I'm not sure how to respond. Could you rephrase your question?"
                .to_string(),

            exhausted: "I encountered an issue processing your request. Please try again."
                .to_string(),

            failure: "Sorry, I encountered an error processing your message.".to_string(),

            reset: "Conversation history cleared!".to_string(),
        }
    }
}
