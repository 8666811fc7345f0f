//! Conversation store keyed by conversation id.

use super::{Conversation, ConversationId};
use crate::llm::Message;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Exclusive handle on one conversation.
///
/// Holding the guard serializes all access to that conversation; other
/// conversations are unaffected.
pub type ConversationGuard = OwnedMutexGuard<Conversation>;

/// Process-lifetime store of all conversations.
pub struct ConversationStore {
    conversations: Mutex<HashMap<ConversationId, Arc<AsyncMutex<Conversation>>>>,
    max_history: usize,
}

impl ConversationStore {
    /// Create a store whose conversations hold at most `max_history` messages.
    pub fn new(max_history: usize) -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
            max_history,
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Lock a conversation for exclusive use, creating it on first access.
    pub async fn lock(&self, id: &ConversationId) -> ConversationGuard {
        self.entry(id).lock_owned().await
    }

    /// Append a message to a conversation.
    pub async fn append(&self, id: &ConversationId, message: Message) {
        self.lock(id).await.push(message);
    }

    /// Snapshot of a conversation's messages.
    pub async fn read(&self, id: &ConversationId) -> Vec<Message> {
        self.lock(id).await.messages().to_vec()
    }

    /// Empty a conversation. The id stays known to the store.
    pub async fn reset(&self, id: &ConversationId) {
        self.lock(id).await.clear();
    }

    /// Number of conversations seen so far.
    pub fn conversation_count(&self) -> usize {
        self.map().len()
    }

    fn entry(&self, id: &ConversationId) -> Arc<AsyncMutex<Conversation>> {
        let max_history = self.max_history;
        self.map()
            .entry(id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(Conversation::new(max_history))))
            .clone()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<ConversationId, Arc<AsyncMutex<Conversation>>>> {
        // The map holds no invariants a panicking holder could break.
        self.conversations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_append_then_read() {
        let store = ConversationStore::new(10);
        let id = ConversationId::Int(1);

        store.append(&id, Message::user("hello")).await;
        store.append(&id, Message::assistant("hi there")).await;

        let messages = store.read(&id).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages.last(), Some(&Message::assistant("hi there")));
    }

    #[tokio::test]
    async fn test_read_creates_empty_conversation() {
        let store = ConversationStore::new(10);
        assert!(store.read(&ConversationId::from("new")).await.is_empty());
        assert_eq!(store.conversation_count(), 1);
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let store = ConversationStore::new(10);
        let id = ConversationId::Int(7);
        store.append(&id, Message::user("hello")).await;

        store.reset(&id).await;
        let once = store.read(&id).await;
        store.reset(&id).await;
        let twice = store.read(&id).await;

        assert!(once.is_empty());
        assert_eq!(once, twice);
        assert_eq!(store.conversation_count(), 1);
    }

    #[tokio::test]
    async fn test_conversations_are_independent() {
        let store = ConversationStore::new(10);
        let a = ConversationId::Int(1);
        let b = ConversationId::Int(2);

        store.append(&a, Message::user("for a")).await;
        store.reset(&b).await;

        assert_eq!(store.read(&a).await.len(), 1);
        assert!(store.read(&b).await.is_empty());
    }

    #[tokio::test]
    async fn test_store_applies_trim() {
        let store = ConversationStore::new(3);
        let id = ConversationId::Int(1);
        store.append(&id, Message::system("sys")).await;
        for i in 0..5 {
            store.append(&id, Message::user(format!("m{}", i))).await;
        }

        let messages = store.read(&id).await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::system("sys"));
        assert_eq!(messages[2], Message::user("m4"));
    }

    #[tokio::test]
    async fn test_lock_serializes_same_conversation() {
        let store = Arc::new(ConversationStore::new(10));
        let id = ConversationId::Int(1);

        let mut guard = store.lock(&id).await;
        guard.push(Message::user("first"));

        let writer = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move { store.append(&id, Message::user("second")).await })
        };

        // The writer cannot interleave while the guard is held.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(guard.len(), 1);
        guard.push(Message::assistant("reply"));
        drop(guard);

        writer.await.unwrap();
        let contents: Vec<String> = store.read(&id).await.into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["first", "reply", "second"]);
    }

    #[tokio::test]
    async fn test_other_conversation_not_blocked() {
        let store = ConversationStore::new(10);
        let _guard = store.lock(&ConversationId::Int(1)).await;

        let result = tokio::time::timeout(
            Duration::from_millis(100),
            store.append(&ConversationId::Int(2), Message::user("hi")),
        )
        .await;
        assert!(result.is_ok());
    }
}
