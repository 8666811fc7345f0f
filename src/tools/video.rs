//! YouTube video metadata and transcripts via yt-dlp.

use super::{web::HtmlExtractor, VideoInfo, VideoInfoSource};
use crate::error::{Result, TolkError};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Subtitle format requested from the caption track list.
const CAPTION_FORMAT: &str = "vtt";

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            (?:youtube\.com/shorts/([a-zA-Z0-9_-]{11}))
            |
            (?:(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([a-zA-Z0-9_-]{11}))
            |
            (?:youtube\.com/watch\?.*?[?&]?v=([a-zA-Z0-9_-]{11}))
        ",
        )
        .expect("Invalid regex")
    })
}

/// Extract the 11-character video id from a YouTube URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    let caps = video_id_regex().captures(url.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().to_string())
}

/// Check whether a URL points at a YouTube video.
pub fn is_video_url(url: &str) -> bool {
    extract_video_id(url).is_some()
}

/// Video source backed by the `yt-dlp` command-line tool.
pub struct YtDlpVideoSource {
    http: reqwest::Client,
    binary: String,
    extractor: HtmlExtractor,
}

impl YtDlpVideoSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            binary: "yt-dlp".to_string(),
            extractor: HtmlExtractor::new(),
        })
    }

    /// Use a different yt-dlp executable.
    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }

    async fn dump_json(&self, url: &str) -> Result<serde_json::Value> {
        let output = tokio::process::Command::new(&self.binary)
            .args([
                "--dump-json",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                url,
            ])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TolkError::ToolNotFound(self.binary.clone())
                } else {
                    TolkError::ToolExecution(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TolkError::ToolExecution(format!(
                "Video not found or unavailable: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&stdout)
            .map_err(|e| TolkError::ToolExecution(format!("Failed to parse yt-dlp output: {}", e)))
    }

    async fn fetch_transcript(&self, caption_url: &str) -> Result<String> {
        let vtt = self
            .http
            .get(caption_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_vtt(&vtt, &self.extractor))
    }
}

#[async_trait]
impl VideoInfoSource for YtDlpVideoSource {
    #[instrument(skip(self))]
    async fn video_info(&self, url: &str) -> Result<VideoInfo> {
        let video_id = extract_video_id(url).ok_or_else(|| {
            TolkError::InvalidInput("Could not extract video ID from URL".to_string())
        })?;

        let json = self.dump_json(url).await?;
        let mut info = parse_metadata(&video_id, &json);

        if let Some(caption_url) = caption_url(&json) {
            match self.fetch_transcript(&caption_url).await {
                Ok(transcript) if !transcript.is_empty() => info.transcript = Some(transcript),
                Ok(_) => debug!("Empty transcript for {}", video_id),
                Err(e) => warn!("Could not get transcript for {}: {}", video_id, e),
            }
        } else {
            debug!("No English captions for {}", video_id);
        }

        Ok(info)
    }
}

/// Map yt-dlp JSON onto [`VideoInfo`] (without transcript).
fn parse_metadata(video_id: &str, json: &serde_json::Value) -> VideoInfo {
    let title = json["title"].as_str().unwrap_or("Unknown").to_string();

    let channel = json["channel"]
        .as_str()
        .or_else(|| json["uploader"].as_str())
        .map(|s| s.to_string());

    let published = json["upload_date"]
        .as_str()
        .filter(|d| d.len() == 8)
        .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y%m%d").ok());

    VideoInfo {
        video_id: video_id.to_string(),
        title,
        channel,
        description: json["description"].as_str().map(|s| s.to_string()),
        duration_seconds: json["duration"].as_f64().map(|d| d as u64),
        published,
        transcript: None,
    }
}

/// Pick an English caption track, preferring manual subtitles over automatic ones.
fn caption_url(json: &serde_json::Value) -> Option<String> {
    ["subtitles", "automatic_captions"].iter().find_map(|key| {
        let tracks = json[*key].as_object()?;
        let mut languages: Vec<&String> = tracks
            .keys()
            .filter(|lang| *lang == "en" || lang.starts_with("en-"))
            .collect();
        // Exact "en" first, then regional variants.
        languages.sort_by_key(|lang| (lang.as_str() != "en", lang.len()));

        languages.into_iter().find_map(|lang| {
            tracks[lang.as_str()]
                .as_array()?
                .iter()
                .find(|t| t["ext"].as_str() == Some(CAPTION_FORMAT))
                .and_then(|t| t["url"].as_str())
                .map(|s| s.to_string())
        })
    })
}

/// Collapse a WebVTT caption file into plain transcript text.
fn parse_vtt(vtt: &str, extractor: &HtmlExtractor) -> String {
    let mut lines: Vec<String> = Vec::new();

    for raw in vtt.lines() {
        let line = raw.trim();
        if line.is_empty()
            || line.starts_with("WEBVTT")
            || line.starts_with("Kind:")
            || line.starts_with("Language:")
            || line.starts_with("NOTE")
            || line.contains("-->")
            || line.chars().all(|c| c.is_ascii_digit())
        {
            continue;
        }

        let text = extractor.inline_text(line);
        // Automatic captions repeat each line across consecutive cues.
        if !text.is_empty() && lines.last() != Some(&text) {
            lines.push(text);
        }
    }

    lines.join(" ")
}
