//! Web search backends: DuckDuckGo (no key), Brave Search and Tavily.

use super::{web::HtmlExtractor, SearchHit, SearchResults, WebSearch};
use crate::config::ToolSettings;
use crate::error::{Result, TolkError};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

const DUCKDUCKGO_URL: &str = "https://html.duckduckgo.com/html/";
const BRAVE_URL: &str = "https://api.search.brave.com/res/v1/web/search";
const TAVILY_URL: &str = "https://api.tavily.com/search";
const SEARCH_TIMEOUT_SECS: u64 = 10;

/// Supported search engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEngine {
    DuckDuckGo,
    Brave,
    Tavily,
}

impl std::str::FromStr for SearchEngine {
    type Err = TolkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "duckduckgo" | "ddg" => Ok(SearchEngine::DuckDuckGo),
            "brave" => Ok(SearchEngine::Brave),
            "tavily" => Ok(SearchEngine::Tavily),
            _ => Err(TolkError::Config(format!(
                "Unsupported search engine: {}. Expected: duckduckgo, brave, tavily",
                s
            ))),
        }
    }
}

impl std::fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchEngine::DuckDuckGo => write!(f, "duckduckgo"),
            SearchEngine::Brave => write!(f, "brave"),
            SearchEngine::Tavily => write!(f, "tavily"),
        }
    }
}

/// Web search over the configured engine.
pub struct WebSearcher {
    http: reqwest::Client,
    engine: SearchEngine,
    brave_api_key: Option<String>,
    tavily_api_key: Option<String>,
    parser: DuckDuckGoParser,
}

impl WebSearcher {
    pub fn new(engine: SearchEngine) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;

        Ok(Self {
            http,
            engine,
            brave_api_key: None,
            tavily_api_key: None,
            parser: DuckDuckGoParser::new(),
        })
    }

    /// Build a searcher from the `[tools]` settings section.
    pub fn from_settings(settings: &ToolSettings) -> Result<Self> {
        let mut searcher = Self::new(settings.search_engine.parse()?)?;
        searcher.brave_api_key = settings.brave_api_key.clone().filter(|k| !k.is_empty());
        searcher.tavily_api_key = settings.tavily_api_key.clone().filter(|k| !k.is_empty());
        Ok(searcher)
    }

    pub fn engine(&self) -> SearchEngine {
        self.engine
    }

    async fn search_duckduckgo(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let html = self
            .http
            .post(DUCKDUCKGO_URL)
            .form(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(self.parser.parse(&html, max_results))
    }

    async fn search_brave(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let api_key = self.brave_api_key.as_deref().ok_or_else(|| {
            TolkError::ToolExecution("BRAVE_API_KEY not set in environment variables".to_string())
        })?;

        let count = max_results.to_string();
        let response: BraveResponse = self
            .http
            .get(BRAVE_URL)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .take(max_results)
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: self.parser.extractor.inline_text(&r.description),
            })
            .collect())
    }

    async fn search_tavily(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let api_key = self.tavily_api_key.as_deref().ok_or_else(|| {
            TolkError::ToolExecution("TAVILY_API_KEY not set in environment variables".to_string())
        })?;

        let response: TavilyResponse = self
            .http
            .post(TAVILY_URL)
            .json(&serde_json::json!({
                "api_key": api_key,
                "query": query,
                "max_results": max_results,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .results
            .into_iter()
            .take(max_results)
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.content,
            })
            .collect())
    }
}

#[async_trait]
impl WebSearch for WebSearcher {
    #[instrument(skip(self), fields(engine = %self.engine))]
    async fn search(&self, query: &str, max_results: usize) -> Result<SearchResults> {
        let results = match self.engine {
            SearchEngine::DuckDuckGo => self.search_duckduckgo(query, max_results).await,
            SearchEngine::Brave => self.search_brave(query, max_results).await,
            SearchEngine::Tavily => self.search_tavily(query, max_results).await,
        }
        .map_err(|e| {
            error!("{} search error: {}", self.engine, e);
            e
        })?;

        debug!("{} search returned {} results", self.engine, results.len());

        Ok(SearchResults {
            query: query.to_string(),
            engine: self.engine.to_string(),
            results,
        })
    }
}

/// Parser for the DuckDuckGo HTML results page.
struct DuckDuckGoParser {
    result_link: Regex,
    snippet: Regex,
    href: Regex,
    extractor: HtmlExtractor,
}

impl DuckDuckGoParser {
    fn new() -> Self {
        Self {
            result_link: Regex::new(r#"(?is)<a([^>]*class="[^"]*result__a[^"]*"[^>]*)>(.*?)</a>"#)
                .expect("Invalid regex"),
            snippet: Regex::new(r#"(?is)<(?:a|div|td)[^>]*class="[^"]*result__snippet[^"]*"[^>]*>(.*?)</(?:a|div|td)>"#)
                .expect("Invalid regex"),
            href: Regex::new(r#"href="([^"]*)""#).expect("Invalid regex"),
            extractor: HtmlExtractor::new(),
        }
    }

    /// Each result spans from its title link to the next one; the snippet is
    /// only looked up inside that span.
    fn parse(&self, html: &str, max_results: usize) -> Vec<SearchHit> {
        let links: Vec<regex::Captures> = self.result_link.captures_iter(html).collect();

        links
            .iter()
            .enumerate()
            .filter_map(|(i, caps)| {
                let href = self.href.captures(&caps[1])?.get(1)?.as_str();
                let start = caps.get(0)?.end();
                let end = links
                    .get(i + 1)
                    .and_then(|next| next.get(0))
                    .map_or(html.len(), |m| m.start());

                let snippet = self
                    .snippet
                    .captures(&html[start..end])
                    .map(|c| self.extractor.inline_text(&c[1]))
                    .unwrap_or_default();

                Some(SearchHit {
                    title: self.extractor.inline_text(&caps[2]),
                    url: resolve_redirect(&self.extractor.inline_text(href)),
                    snippet,
                })
            })
            .take(max_results)
            .collect()
    }
}

/// Unwrap DuckDuckGo's `/l/?uddg=<target>` redirect links.
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    url::Url::parse(&absolute)
        .ok()
        .filter(|u| u.path().starts_with("/l/"))
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or(absolute)
}

#[derive(Deserialize)]
struct BraveResponse {
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DDG_PAGE: &str = r#"
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fdoc.rust-lang.org%2Fbook%2Fch04-01-what-is-ownership.html&amp;rut=abc">What is <b>Ownership</b>? - The Rust Programming Language</a>
  </h2>
  <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">Ownership is a set of rules that govern how a <b>Rust</b> program manages memory.</a>
</div>
<div class="result results_links web-result">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://example.com/rust">Rust &amp; you</a>
  </h2>
  <a class="result__snippet" href="https://example.com/rust">Second snippet</a>
</div>
"#;

    #[test]
    fn test_parse_search_engine() {
        assert_eq!("DuckDuckGo".parse::<SearchEngine>().unwrap(), SearchEngine::DuckDuckGo);
        assert_eq!("brave".parse::<SearchEngine>().unwrap(), SearchEngine::Brave);
        assert_eq!("tavily".parse::<SearchEngine>().unwrap(), SearchEngine::Tavily);
        assert!(matches!("bing".parse::<SearchEngine>(), Err(TolkError::Config(_))));
    }

    #[test]
    fn test_parse_duckduckgo_results() {
        let parser = DuckDuckGoParser::new();
        let hits = parser.parse(DDG_PAGE, 5);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "What is Ownership? - The Rust Programming Language");
        assert_eq!(
            hits[0].url,
            "https://doc.rust-lang.org/book/ch04-01-what-is-ownership.html"
        );
        assert_eq!(
            hits[0].snippet,
            "Ownership is a set of rules that govern how a Rust program manages memory."
        );
        assert_eq!(hits[1].title, "Rust & you");
        assert_eq!(hits[1].url, "https://example.com/rust");
        assert_eq!(hits[1].snippet, "Second snippet");
    }

    #[test]
    fn test_snippet_stays_with_its_result() {
        let page = r#"
<div class="result">
  <a class="result__a" href="https://a.example">Result A</a>
</div>
<div class="result">
  <a class="result__a" href="https://b.example">Result B</a>
  <a class="result__snippet" href="https://b.example">snippet for B</a>
</div>
"#;
        let hits = DuckDuckGoParser::new().parse(page, 5);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://a.example");
        assert_eq!(hits[0].snippet, "");
        assert_eq!(hits[1].url, "https://b.example");
        assert_eq!(hits[1].snippet, "snippet for B");
    }

    #[test]
    fn test_parse_duckduckgo_respects_limit() {
        let parser = DuckDuckGoParser::new();
        assert_eq!(parser.parse(DDG_PAGE, 1).len(), 1);
        assert!(parser.parse("<html></html>", 5).is_empty());
    }

    #[test]
    fn test_resolve_redirect_passthrough() {
        assert_eq!(resolve_redirect("https://example.com/a"), "https://example.com/a");
    }

    #[tokio::test]
    async fn test_brave_without_key_fails() {
        let searcher = WebSearcher::new(SearchEngine::Brave).unwrap();
        let err = searcher.search("rust", 5).await.unwrap_err();
        assert!(err.to_string().contains("BRAVE_API_KEY"));
    }

    #[test]
    fn test_brave_response_shape() {
        let response: BraveResponse = serde_json::from_value(serde_json::json!({
            "web": {"results": [{"title": "T", "url": "https://t.example", "description": "<strong>D</strong>"}]}
        }))
        .unwrap();
        let web = response.web.unwrap();
        assert_eq!(web.results[0].url, "https://t.example");
    }
}
