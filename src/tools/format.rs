//! Rendering of tool results into text blocks for the model.

use super::{PageContent, SearchResults, VideoInfo};

const SNIPPET_CHARS: usize = 200;
const DESCRIPTION_CHARS: usize = 300;
const TRANSCRIPT_CHARS: usize = 2000;

/// Truncate to at most `max_chars` characters, returning whether anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

/// Render search results as a numbered list.
pub fn format_search_results(results: &SearchResults) -> String {
    if results.results.is_empty() {
        return format!("No results found for: {}", results.query);
    }

    let mut lines = vec![format!(
        "**Search results for: {}** (via {})\n",
        results.query, results.engine
    )];

    for (i, hit) in results.results.iter().enumerate() {
        lines.push(format!("{}. **{}**", i + 1, hit.title));
        lines.push(format!("   {}", hit.url));
        if !hit.snippet.is_empty() {
            let (snippet, cut) = truncate_chars(&hit.snippet, SNIPPET_CHARS);
            let ellipsis = if cut { "..." } else { "" };
            lines.push(format!("   {}{}", snippet, ellipsis));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Render a fetched page as title, URL and body.
pub fn format_page(page: &PageContent) -> String {
    format!("**{}**\n\nURL: {}\n\n{}", page.title, page.url, page.content)
}

/// Render video metadata and transcript.
pub fn format_video_info(info: &VideoInfo) -> String {
    let mut lines = vec![
        format!("**YouTube Video: {}**", info.title),
        format!("Video ID: {}", info.video_id),
    ];

    if let Some(channel) = info.channel.as_deref().filter(|c| !c.is_empty()) {
        lines.push(format!("Channel: {}", channel));
    }

    if let Some(duration) = info.duration_seconds.filter(|d| *d > 0) {
        lines.push(format!("Duration: {}m {}s", duration / 60, duration % 60));
    }

    if let Some(published) = info.published {
        lines.push(format!("Uploaded: {}", published.format("%Y-%m-%d")));
    }

    if let Some(description) = info.description.as_deref().filter(|d| !d.is_empty()) {
        let (desc, cut) = truncate_chars(description, DESCRIPTION_CHARS);
        let ellipsis = if cut { "..." } else { "" };
        lines.push(format!("\nDescription:\n{}{}", desc, ellipsis));
    }

    match info.transcript.as_deref().filter(|t| !t.is_empty()) {
        Some(transcript) => {
            let (text, cut) = truncate_chars(transcript, TRANSCRIPT_CHARS);
            let marker = if cut { "\n\n[Transcript truncated...]" } else { "" };
            lines.push(format!("\nTranscript:\n{}{}", text, marker));
        }
        None => lines.push("\nTranscript: Not available".to_string()),
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::SearchHit;
    use chrono::NaiveDate;

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), ("hé", true));
        assert_eq!(truncate_chars("abc", 3), ("abc", false));
        assert_eq!(truncate_chars("", 5), ("", false));
    }

    #[test]
    fn test_format_search_results() {
        let results = SearchResults {
            query: "rust ownership".to_string(),
            engine: "duckduckgo".to_string(),
            results: vec![
                SearchHit {
                    title: "The Rust Book".to_string(),
                    url: "https://doc.rust-lang.org/book/".to_string(),
                    snippet: "x".repeat(250),
                },
                SearchHit {
                    title: "Blog".to_string(),
                    url: "https://example.com".to_string(),
                    snippet: String::new(),
                },
            ],
        };

        let text = format_search_results(&results);
        assert!(text.starts_with("**Search results for: rust ownership** (via duckduckgo)"));
        assert!(text.contains("1. **The Rust Book**"));
        assert!(text.contains("   https://doc.rust-lang.org/book/"));
        assert!(text.contains(&format!("   {}...", "x".repeat(200))));
        assert!(!text.contains(&"x".repeat(201)));
        assert!(text.contains("2. **Blog**"));
    }

    #[test]
    fn test_format_empty_search() {
        let results = SearchResults {
            query: "nothing".to_string(),
            engine: "brave".to_string(),
            results: vec![],
        };
        assert_eq!(format_search_results(&results), "No results found for: nothing");
    }

    #[test]
    fn test_format_page() {
        let page = PageContent {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            content: "Body text".to_string(),
        };
        assert_eq!(format_page(&page), "**Example**\n\nURL: https://example.com\n\nBody text");
    }

    #[test]
    fn test_format_video_info() {
        let info = VideoInfo {
            video_id: "dQw4w9WgXcQ".to_string(),
            title: "Never Gonna".to_string(),
            channel: Some("Rick".to_string()),
            description: Some("d".repeat(350)),
            duration_seconds: Some(213),
            published: NaiveDate::from_ymd_opt(2009, 10, 25),
            transcript: Some("t".repeat(2100)),
        };

        let text = format_video_info(&info);
        assert!(text.contains("**YouTube Video: Never Gonna**"));
        assert!(text.contains("Channel: Rick"));
        assert!(text.contains("Duration: 3m 33s"));
        assert!(text.contains("Uploaded: 2009-10-25"));
        assert!(text.contains(&format!("{}...", "d".repeat(300))));
        assert!(text.ends_with("[Transcript truncated...]"));
        assert!(!text.contains(&"t".repeat(2001)));
    }

    #[test]
    fn test_format_video_without_transcript() {
        let info = VideoInfo {
            video_id: "abc".to_string(),
            title: "Untitled".to_string(),
            ..Default::default()
        };
        let text = format_video_info(&info);
        assert!(text.ends_with("Transcript: Not available"));
        assert!(!text.contains("Duration"));
    }
}
