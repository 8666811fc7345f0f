//! Message orchestrator for Tolk.
//!
//! Coordinates one inbound user message from conversation lookup through the
//! agent loop to the reply text handed back to a transport.

use crate::agent::{Agent, AgentOutcome, AgentResponse, ToolDispatcher, ToolExecutor};
use crate::config::{Prompts, Settings};
use crate::conversation::{Conversation, ConversationId, ConversationStore};
use crate::error::{Result, TolkError};
use crate::llm::{create_provider, LlmProvider, Message};
use crate::tools::{extract_urls, format_video_info, is_video_url, VideoInfoSource};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Prefix of the assistant turn carrying pre-fetched video details.
const VIDEO_CONTEXT_PREFIX: &str = "[YouTube video info]";

/// The main orchestrator: one per process, shared by every transport.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    store: Arc<ConversationStore>,
    agent: Agent,
    video: Arc<dyn VideoInfoSource>,
    prompts: Prompts,
    auto_video_context: bool,
}

impl Orchestrator {
    /// Create an orchestrator with network-backed provider and tools.
    ///
    /// Fails on configuration problems: unknown provider or search engine,
    /// missing credential, missing endpoint.
    pub fn new(settings: &Settings) -> Result<Self> {
        let provider = create_provider(&settings.llm)?;
        let video = ToolDispatcher::default_video_source(&settings.tools)?;
        let tools = Arc::new(ToolDispatcher::from_settings(&settings.tools, video.clone())?);

        info!(
            "Orchestrator ready: {} ({}), tools: {}, search: {}",
            provider.name(),
            provider.model(),
            provider.supports_tool_calling(),
            settings.tools.search_engine
        );

        Ok(Self::with_parts(settings, provider, tools, video))
    }

    /// Assemble an orchestrator from already-built parts.
    pub fn with_parts(
        settings: &Settings,
        provider: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolExecutor>,
        video: Arc<dyn VideoInfoSource>,
    ) -> Self {
        let agent = Agent::new(provider.clone(), tools)
            .with_max_iterations(settings.chat.max_iterations)
            .with_sampling(settings.llm.max_tokens, settings.llm.temperature as f32);

        Self {
            provider,
            store: Arc::new(ConversationStore::new(settings.chat.max_history)),
            agent,
            video,
            prompts: settings.prompts.clone(),
            auto_video_context: settings.chat.auto_video_context,
        }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    /// Handle one user message and return the raw agent result.
    ///
    /// The conversation stays locked for the whole run, so messages for the
    /// same id are processed one at a time. Blank text is rejected before the
    /// history is touched.
    #[instrument(skip(self, text), fields(conversation = %id))]
    pub async fn handle_message(&self, id: &ConversationId, text: &str) -> Result<AgentResponse> {
        if text.trim().is_empty() {
            return Err(TolkError::InvalidInput("Empty message".to_string()));
        }

        let mut conversation = self.store.lock(id).await;

        if conversation.is_empty() {
            conversation.push(Message::system(self.prompts.system.clone()));
        }
        conversation.push(Message::user(text));

        if self.auto_video_context {
            self.add_video_context(&mut conversation, text).await;
        }

        let response = self.agent.run(&mut conversation).await?;
        debug!(
            "Run finished after {} iterations, {} tool calls, {} output tokens",
            response.iterations,
            response.tool_calls.len(),
            response.usage.output_tokens
        );
        Ok(response)
    }

    /// Handle one user message and always produce reply text.
    pub async fn reply(&self, id: &ConversationId, text: &str) -> String {
        match self.handle_message(id, text).await {
            Ok(response) => self.render(&response.outcome),
            Err(e) => {
                error!("Error handling message for {}: {}", id, e);
                self.prompts.failure.clone()
            }
        }
    }

    /// Map an agent outcome to the text shown to the user.
    pub fn render(&self, outcome: &AgentOutcome) -> String {
        match outcome {
            AgentOutcome::Answer(text) => text.clone(),
            AgentOutcome::Empty => self.prompts.empty_response.clone(),
            AgentOutcome::Exhausted => self.prompts.exhausted.clone(),
        }
    }

    /// Clear a conversation's history.
    pub async fn reset(&self, id: &ConversationId) {
        self.store.reset(id).await;
        info!("Cleared history for conversation {}", id);
    }

    async fn add_video_context(&self, conversation: &mut Conversation, text: &str) {
        for url in extract_urls(text).into_iter().filter(|u| is_video_url(u)) {
            debug!("Pre-fetching video info for {}", url);
            let rendered = match self.video.video_info(&url).await {
                Ok(info) => format_video_info(&info),
                Err(e) => format!("Error: {}", e),
            };
            conversation.push(Message::assistant(format!(
                "{}\n{}",
                VIDEO_CONTEXT_PREFIX, rendered
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResponse, Role, ToolCall, ToolDescriptor, Usage};
    use crate::tools::VideoInfo;
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Provider that answers with the last user message, or a scripted reply.
    struct EchoProvider {
        script: Mutex<Vec<Result<LlmResponse>>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl EchoProvider {
        fn new() -> Self {
            Self {
                script: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn scripted(mut responses: Vec<Result<LlmResponse>>) -> Self {
            responses.reverse();
            Self {
                script: Mutex::new(responses),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn generate(
            &self,
            messages: &[Message],
            _tools: Option<&[ToolDescriptor]>,
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<LlmResponse> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if let Some(response) = self.script.lock().unwrap().pop() {
                return response;
            }
            let last_user = messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(LlmResponse {
                content: format!("echo: {}", last_user),
                ..Default::default()
            })
        }

        fn supports_tool_calling(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }
    }

    struct NoTools;

    #[async_trait]
    impl ToolExecutor for NoTools {
        async fn execute(&self, name: &str, _arguments: &Map<String, Value>) -> String {
            format!("{} ran", name)
        }
    }

    struct FakeVideo;

    #[async_trait]
    impl VideoInfoSource for FakeVideo {
        async fn video_info(&self, url: &str) -> Result<VideoInfo> {
            Ok(VideoInfo {
                video_id: "dQw4w9WgXcQ".to_string(),
                title: format!("Video at {}", url),
                ..Default::default()
            })
        }
    }

    fn orchestrator(provider: Arc<EchoProvider>, settings: Settings) -> Orchestrator {
        Orchestrator::with_parts(
            &settings,
            provider,
            Arc::new(NoTools),
            Arc::new(FakeVideo),
        )
    }

    #[tokio::test]
    async fn test_first_message_bootstraps_system_prompt() {
        let orch = orchestrator(Arc::new(EchoProvider::new()), Settings::default());
        let id = ConversationId::Int(42);

        let reply = orch.reply(&id, "hello").await;
        assert_eq!(reply, "echo: hello");

        let messages = orch.store().read(&id).await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::system(orch.prompts().system.clone()));
        assert_eq!(messages[1], Message::user("hello"));
        assert_eq!(messages[2], Message::assistant("echo: hello"));

        orch.reply(&id, "again").await;
        let messages = orch.store().read(&id).await;
        assert_eq!(messages.iter().filter(|m| m.is_system()).count(), 1);
        assert_eq!(messages.len(), 5);
    }

    #[tokio::test]
    async fn test_video_links_are_prefetched() {
        let orch = orchestrator(Arc::new(EchoProvider::new()), Settings::default());
        let id = ConversationId::from("video-chat");

        orch.reply(&id, "what is this? https://youtu.be/dQw4w9WgXcQ and https://example.com")
            .await;

        let messages = orch.store().read(&id).await;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].role, Role::Assistant);
        assert!(messages[2].content.starts_with("[YouTube video info]\n"));
        assert!(messages[2].content.contains("Video at https://youtu.be/dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn test_video_prefetch_can_be_disabled() {
        let mut settings = Settings::default();
        settings.chat.auto_video_context = false;
        let orch = orchestrator(Arc::new(EchoProvider::new()), settings);
        let id = ConversationId::Int(1);

        orch.reply(&id, "https://youtu.be/dQw4w9WgXcQ").await;
        assert_eq!(orch.store().read(&id).await.len(), 3);
    }

    #[tokio::test]
    async fn test_outcomes_render_fallback_texts() {
        let looping = LlmResponse {
            tool_calls: vec![ToolCall {
                id: "1".to_string(),
                name: "search_web".to_string(),
                arguments: Map::new(),
            }],
            usage: Usage::default(),
            ..Default::default()
        };
        let mut settings = Settings::default();
        settings.chat.max_iterations = 2;

        let provider = EchoProvider::scripted(vec![
            Ok(LlmResponse::default()),
            Ok(looping.clone()),
            Ok(looping),
            Err(TolkError::provider("echo", "503 Service Unavailable")),
        ]);
        let orch = orchestrator(Arc::new(provider), settings);
        let prompts = Prompts::default();
        let id = ConversationId::Int(7);

        assert_eq!(orch.reply(&id, "one").await, prompts.empty_response);
        assert_eq!(orch.reply(&id, "two").await, prompts.exhausted);
        assert_eq!(orch.reply(&id, "three").await, prompts.failure);
    }

    #[tokio::test]
    async fn test_blank_message_leaves_history_untouched() {
        let orch = orchestrator(Arc::new(EchoProvider::new()), Settings::default());
        let id = ConversationId::Int(5);

        let err = orch.handle_message(&id, "   ").await.err().unwrap();
        assert!(matches!(err, TolkError::InvalidInput(_)));
        assert_eq!(orch.reply(&id, "\n\t").await, orch.prompts().failure);
        assert!(orch.store().read(&id).await.is_empty());

        assert_eq!(orch.reply(&id, "hello").await, "echo: hello");
        let messages = orch.store().read(&id).await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], Message::user("hello"));
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let orch = orchestrator(Arc::new(EchoProvider::new()), Settings::default());
        let id = ConversationId::Int(3);

        orch.reply(&id, "hello").await;
        orch.reset(&id).await;
        assert!(orch.store().read(&id).await.is_empty());

        orch.reply(&id, "fresh start").await;
        let messages = orch.store().read(&id).await;
        assert!(messages[0].is_system());
        assert_eq!(messages.len(), 3);
    }

    #[tokio::test]
    async fn test_same_conversation_is_serialized() {
        let provider = Arc::new(EchoProvider::new());
        let orch = Arc::new(orchestrator(provider.clone(), Settings::default()));
        let id = ConversationId::Int(9);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let orch = orch.clone();
                let id = id.clone();
                tokio::spawn(async move { orch.reply(&id, &format!("msg {}", i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let messages = orch.store().read(&id).await;
        assert_eq!(messages.len(), 1 + 4 * 2);
        // Every user turn is immediately followed by its own answer.
        for pair in messages[1..].chunks(2) {
            assert_eq!(pair[1].content, format!("echo: {}", pair[0].content));
        }
        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
