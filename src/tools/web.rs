//! Web page fetching and text extraction.

use super::{format::truncate_chars, PageContent, PageFetcher};
use crate::error::{Result, TolkError};
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, error, instrument};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Tag attributes, allowing `>` inside quoted values.
const ATTRS: &str = r#"(?:[^>"']|"[^"]*"|'[^']*')*"#;

/// Elements whose content is never part of the readable text.
const STRIPPED_ELEMENTS: [&str; 5] = ["script", "style", "nav", "footer", "header"];

/// Regex-based HTML to text extraction.
pub struct HtmlExtractor {
    title: Regex,
    stripped: Vec<Regex>,
    main: Regex,
    article: Regex,
    content_div: Regex,
    body: Regex,
    block_break: Regex,
    tag: Regex,
    entity: Regex,
}

impl HtmlExtractor {
    pub fn new() -> Self {
        let stripped = STRIPPED_ELEMENTS
            .iter()
            .map(|el| Regex::new(&format!(r"(?is)<{el}\b{ATTRS}>.*?</{el}\s*>")).expect("Invalid regex"))
            .collect();

        Self {
            title: Regex::new(&format!(r"(?is)<title\b{ATTRS}>(.*?)</title\s*>")).expect("Invalid regex"),
            stripped,
            main: Regex::new(&format!(r"(?is)<main\b{ATTRS}>(.*)</main\s*>")).expect("Invalid regex"),
            article: Regex::new(&format!(r"(?is)<article\b{ATTRS}>(.*)</article\s*>"))
                .expect("Invalid regex"),
            content_div: Regex::new(&format!(
                r#"(?is)<div\b[^>]*?class\s*=\s*["'][^"']*(?:content|article|post)[^"']*["']{ATTRS}>(.*?)(?:</body\s*>|$)"#
            ))
            .expect("Invalid regex"),
            body: Regex::new(&format!(r"(?is)<body\b{ATTRS}>(.*?)(?:</body\s*>|$)")).expect("Invalid regex"),
            block_break: Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|h[1-6]|tr|section|blockquote|pre)\s*>")
                .expect("Invalid regex"),
            tag: Regex::new(&format!(r"(?s)<[a-zA-Z/!]{ATTRS}>")).expect("Invalid regex"),
            entity: Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("Invalid regex"),
        }
    }

    /// Extract the page title, if any.
    pub fn title(&self, html: &str) -> Option<String> {
        self.title
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| self.decode_entities(m.as_str()).trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Extract readable text, preferring the main content region.
    pub fn text(&self, html: &str) -> String {
        let mut cleaned = html.to_string();
        for re in &self.stripped {
            cleaned = re.replace_all(&cleaned, "").into_owned();
        }

        let region = [&self.main, &self.article, &self.content_div, &self.body]
            .iter()
            .find_map(|re| re.captures(&cleaned).and_then(|c| c.get(1)))
            .map(|m| m.as_str())
            .unwrap_or(&cleaned);

        let with_breaks = self.block_break.replace_all(region, "\n");
        let without_tags = self.tag.replace_all(&with_breaks, "\n");
        let decoded = self.decode_entities(&without_tags);

        decoded
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Strip all tags and decode entities from an inline fragment.
    pub fn inline_text(&self, fragment: &str) -> String {
        let without_tags = self.tag.replace_all(fragment, "");
        self.decode_entities(&without_tags).trim().to_string()
    }

    fn decode_entities(&self, text: &str) -> String {
        self.entity
            .replace_all(text, |caps: &regex::Captures| {
                let name = &caps[1];
                let decoded = match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ if name.starts_with("#x") || name.starts_with("#X") => {
                        u32::from_str_radix(&name[2..], 16).ok().and_then(char::from_u32)
                    }
                    _ if name.starts_with('#') => name[1..].parse().ok().and_then(char::from_u32),
                    _ => None,
                };
                decoded
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches pages over HTTP and extracts their text.
pub struct HttpPageFetcher {
    http: reqwest::Client,
    extractor: HtmlExtractor,
    max_chars: usize,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration, max_chars: usize) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            extractor: HtmlExtractor::new(),
            max_chars,
        })
    }

    /// Build a page from raw HTML, applying the length limit.
    fn page_from_html(&self, url: &str, html: &str) -> PageContent {
        let title = self
            .extractor
            .title(html)
            .unwrap_or_else(|| "No title".to_string());
        let text = self.extractor.text(html);

        let content = match truncate_chars(&text, self.max_chars) {
            (head, true) => format!("{}\n\n[Content truncated...]", head),
            (all, false) => all.to_string(),
        };

        PageContent {
            url: url.to_string(),
            title,
            content,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(skip(self))]
    async fn fetch_page(&self, url: &str) -> Result<PageContent> {
        validate_url(url)?;

        let response = self.http.get(url).send().await.map_err(|e| {
            error!("Error fetching URL {}: {}", url, e);
            TolkError::Http(e)
        })?;
        let response = response.error_for_status()?;
        let html = response.text().await?;

        debug!("Fetched {} bytes from {}", html.len(), url);
        Ok(self.page_from_html(url, &html))
    }
}

/// Require an absolute http(s) URL with a host.
fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url)
        .map_err(|_| TolkError::InvalidInput("Invalid URL format".to_string()))?;

    match (parsed.scheme(), parsed.host_str()) {
        ("http" | "https", Some(host)) if !host.is_empty() => Ok(()),
        _ => Err(TolkError::InvalidInput("Invalid URL format".to_string())),
    }
}

/// Find all http(s) URLs in free text.
pub fn extract_urls(text: &str) -> Vec<String> {
    let url_regex = Regex::new(r#"https?://[^\s<>"'\]\)]+"#).expect("Invalid regex");
    url_regex
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', '!', '?']).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Rust &amp; Ownership</title><style>body { color: red; }</style></head>
<body>
<header><a href="/">Home</a></header>
<nav><ul><li>Menu item</li></ul></nav>
<main>
  <h1>Ownership</h1>
  <p>Each value has an <b>owner</b>.</p>
  <script>var tracking = 1;</script>
  <p>Values are dropped&nbsp;when the owner goes out of scope.</p>
</main>
<footer>Copyright</footer>
</body>
</html>"#;

    #[test]
    fn test_extract_title() {
        let extractor = HtmlExtractor::new();
        assert_eq!(extractor.title(PAGE).as_deref(), Some("Rust & Ownership"));
        assert_eq!(extractor.title("<html><body>x</body></html>"), None);
    }

    #[test]
    fn test_extract_main_text() {
        let extractor = HtmlExtractor::new();
        let text = extractor.text(PAGE);

        assert!(text.contains("Ownership"));
        assert!(text.contains("owner"));
        assert!(text.contains("Values are dropped when the owner goes out of scope."));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("Menu item"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("\n\n"));
    }

    #[test]
    fn test_falls_back_to_body() {
        let extractor = HtmlExtractor::new();
        let text = extractor.text("<html><body><p>Just a paragraph</p></body></html>");
        assert_eq!(text, "Just a paragraph");
    }

    #[test]
    fn test_nested_main_and_quoted_angle_brackets() {
        let extractor = HtmlExtractor::new();
        let html = r#"<body><nav data-x="a > b">Skip</nav><main class="outer">
<div title="1 > 0">Inner</div>
<main>Nested</main>
<p>Tail with 2 < 3</p>
</main></body>"#;

        let text = extractor.text(html);
        assert_eq!(text, "Inner\nNested\nTail with 2 < 3");
    }

    #[test]
    fn test_decode_numeric_entities() {
        let extractor = HtmlExtractor::new();
        assert_eq!(extractor.inline_text("caf&#233; &#x2014; <b>bar</b>"), "café — bar");
        assert_eq!(extractor.inline_text("&unknown;"), "&unknown;");
    }

    #[test]
    fn test_page_truncation() {
        let fetcher = HttpPageFetcher::new(Duration::from_secs(5), 10).unwrap();
        let page = fetcher.page_from_html(
            "https://example.com",
            "<html><body><p>abcdefghijklmnopqrstuvwxyz</p></body></html>",
        );

        assert_eq!(page.title, "No title");
        assert_eq!(page.content, "abcdefghij\n\n[Content truncated...]");
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/page").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
        assert!(validate_url("example.com").is_err());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn test_extract_urls() {
        let urls = extract_urls(
            "Look at https://youtu.be/dQw4w9WgXcQ, and (http://example.com/a?b=c) please.",
        );
        assert_eq!(
            urls,
            vec!["https://youtu.be/dQw4w9WgXcQ", "http://example.com/a?b=c"]
        );
        assert!(extract_urls("no links here").is_empty());
    }
}
