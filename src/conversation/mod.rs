//! In-memory conversation history.
//!
//! Each conversation is an ordered, bounded message log keyed by a chat
//! identifier. History lives for the lifetime of the process only.

mod store;

pub use store::{ConversationGuard, ConversationStore};

use crate::llm::Message;
use serde::{Deserialize, Serialize};

/// Identifier of a conversation (chat id from the transport).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConversationId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationId::Int(id) => write!(f, "{}", id),
            ConversationId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        ConversationId::Int(id)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::parse(id)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self::parse(&id)
    }
}

impl ConversationId {
    /// Canonical numeric ids (e.g. `-1001234`) become `Int`, anything else
    /// `Text`. `"007"` and `" 7"` stay distinct from `"7"`.
    pub fn parse(id: &str) -> Self {
        match id.parse::<i64>() {
            Ok(n) if n.to_string() == id => ConversationId::Int(n),
            _ => ConversationId::Text(id.to_string()),
        }
    }
}

/// Ordered message history of a single conversation.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    max_messages: usize,
}

impl Conversation {
    /// Create an empty conversation bounded to `max_messages`.
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages,
        }
    }

    /// Append a message and enforce the history bound.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.trim();
    }

    /// The live message sequence, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Remove every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Keep all system messages plus the newest non-system messages that fit.
    fn trim(&mut self) {
        if self.messages.len() <= self.max_messages {
            return;
        }

        let (system, rest): (Vec<Message>, Vec<Message>) =
            std::mem::take(&mut self.messages)
                .into_iter()
                .partition(Message::is_system);

        let keep = self.max_messages.saturating_sub(system.len());
        let skip = rest.len().saturating_sub(keep);

        self.messages = system;
        self.messages.extend(rest.into_iter().skip(skip));
    }
}
