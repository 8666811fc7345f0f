//! External capabilities the model can call: web search, page fetch, video info.
//!
//! Each collaborator is a trait so the dispatcher can be exercised with fakes;
//! the concrete implementations talk to the network or shell out to `yt-dlp`.

mod format;
mod search;
mod video;
mod web;

pub use format::{format_page, format_search_results, format_video_info, truncate_chars};
pub use search::{SearchEngine, WebSearcher};
pub use video::{extract_video_id, is_video_url, YtDlpVideoSource};
pub use web::{extract_urls, HtmlExtractor, HttpPageFetcher};

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single web search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Results of a web search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    /// Engine that produced the results.
    pub engine: String,
    pub results: Vec<SearchHit>,
}

/// Extracted content of a web page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    pub title: String,
    pub content: String,
}

/// Metadata and transcript of a video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub channel: Option<String>,
    pub description: Option<String>,
    pub duration_seconds: Option<u64>,
    pub published: Option<NaiveDate>,
    pub transcript: Option<String>,
}

/// Web search backend.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<SearchResults>;
}

/// Web page fetcher.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<PageContent>;
}

/// Video metadata and transcript source.
#[async_trait]
pub trait VideoInfoSource: Send + Sync {
    async fn video_info(&self, url: &str) -> Result<VideoInfo>;
}
