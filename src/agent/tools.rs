//! Tool definitions and dispatch for the agent loop.

use crate::config::ToolSettings;
use crate::error::{Result, TolkError};
use crate::llm::ToolDescriptor;
use crate::tools::{
    format_page, format_search_results, format_video_info, HttpPageFetcher, PageFetcher,
    VideoInfoSource, WebSearch, WebSearcher, YtDlpVideoSource,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub const SEARCH_WEB: &str = "search_web";
pub const FETCH_URL: &str = "fetch_url";
pub const GET_YOUTUBE_INFO: &str = "get_youtube_info";

/// Get the tool catalogue offered to the model.
pub fn tool_catalogue() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: SEARCH_WEB.to_string(),
            description: "Search the web for information. Use this when you need to find current \
                information, verify facts, or answer questions that require up-to-date knowledge."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        },
        ToolDescriptor {
            name: FETCH_URL.to_string(),
            description: "Fetch and extract content from a web page URL. Use this to read \
                articles, documentation, or any web page content."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The URL to fetch"
                    }
                },
                "required": ["url"],
                "additionalProperties": false
            }),
        },
        ToolDescriptor {
            name: GET_YOUTUBE_INFO.to_string(),
            description: "Get information and transcript from a YouTube video. Use this when the \
                user shares a YouTube link or asks about a video."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The YouTube video URL"
                    }
                },
                "required": ["url"],
                "additionalProperties": false
            }),
        },
    ]
}

/// Executes a named tool and renders its outcome as text for the model.
///
/// Never fails: unknown tools and collaborator errors become result text.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, name: &str, arguments: &Map<String, Value>) -> String;
}

/// Dispatches tool calls to the search, fetch and video collaborators.
pub struct ToolDispatcher {
    search: Arc<dyn WebSearch>,
    fetcher: Arc<dyn PageFetcher>,
    video: Arc<dyn VideoInfoSource>,
    max_results: usize,
}

impl ToolDispatcher {
    pub fn new(
        search: Arc<dyn WebSearch>,
        fetcher: Arc<dyn PageFetcher>,
        video: Arc<dyn VideoInfoSource>,
    ) -> Self {
        Self {
            search,
            fetcher,
            video,
            max_results: 5,
        }
    }

    /// Set the number of search results handed to the model.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Build a dispatcher with network-backed collaborators.
    pub fn from_settings(
        settings: &ToolSettings,
        video: Arc<dyn VideoInfoSource>,
    ) -> Result<Self> {
        let search = WebSearcher::from_settings(settings)?;
        let fetcher = HttpPageFetcher::new(
            Duration::from_secs(settings.fetch_timeout_secs),
            settings.max_page_chars,
        )?;

        Ok(Self::new(Arc::new(search), Arc::new(fetcher), video)
            .with_max_results(settings.max_results))
    }

    /// Default video collaborator for [`ToolDispatcher::from_settings`].
    pub fn default_video_source(settings: &ToolSettings) -> Result<Arc<dyn VideoInfoSource>> {
        Ok(Arc::new(YtDlpVideoSource::new(Duration::from_secs(
            settings.fetch_timeout_secs,
        ))?))
    }

    async fn search_web(&self, arguments: &Map<String, Value>) -> Result<String> {
        let query = required_str(arguments, "query")?;
        Ok(match self.search.search(query, self.max_results).await {
            Ok(results) => format_search_results(&results),
            Err(e) => format!("Search failed: {}", e),
        })
    }

    async fn fetch_url(&self, arguments: &Map<String, Value>) -> Result<String> {
        let url = required_str(arguments, "url")?;
        Ok(match self.fetcher.fetch_page(url).await {
            Ok(page) => format_page(&page),
            Err(e) => format!("Error fetching URL: {}", e),
        })
    }

    async fn get_youtube_info(&self, arguments: &Map<String, Value>) -> Result<String> {
        let url = required_str(arguments, "url")?;
        Ok(match self.video.video_info(url).await {
            Ok(info) => format_video_info(&info),
            Err(e) => format!("Error: {}", e),
        })
    }
}

#[async_trait]
impl ToolExecutor for ToolDispatcher {
    async fn execute(&self, name: &str, arguments: &Map<String, Value>) -> String {
        info!("Executing tool: {} with args: {}", name, serde_json::Value::Object(arguments.clone()));

        let result = match name {
            SEARCH_WEB => self.search_web(arguments).await,
            FETCH_URL => self.fetch_url(arguments).await,
            GET_YOUTUBE_INFO => self.get_youtube_info(arguments).await,
            _ => return format!("Unknown tool: {}", name),
        };

        result.unwrap_or_else(|e| {
            error!("Error executing tool {}: {}", name, e);
            format!("Error executing {}: {}", name, e)
        })
    }
}

fn required_str<'a>(arguments: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| TolkError::InvalidInput(format!("Missing '{}' argument", key)))
}
