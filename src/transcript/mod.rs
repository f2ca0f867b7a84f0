//! Transcript retrieval for submitted videos.
//!
//! [`TranscriptFetcher`] is the seam the worker talks to; the production
//! implementation is [`youtube::YoutubeTranscriptFetcher`], which reads the
//! title from oEmbed and the captions from the timedtext endpoint.

pub mod timedtext;
pub mod youtube;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::contract::LanguageStyle;

const VIDEO_ID_LEN: usize = 11;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: String,
    pub title: String,
    pub language: String,
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Plain text of all segments, whitespace collapsed to single spaces.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .flat_map(|segment| segment.text.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("unsupported video url: {0}")]
    InvalidUrl(String),
    #[error("transcript unavailable: {0}")]
    Unavailable(String),
    #[error("transcript request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transcript service responded with {0}")]
    UpstreamStatus(StatusCode),
    #[error("failed to parse transcript: {0}")]
    Parse(String),
}

impl TranscriptError {
    pub fn is_retryable(&self) -> bool {
        match self {
            TranscriptError::Http(_) => true,
            TranscriptError::UpstreamStatus(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            TranscriptError::InvalidUrl(_)
            | TranscriptError::Unavailable(_)
            | TranscriptError::Parse(_) => false,
        }
    }
}

#[async_trait]
pub trait TranscriptFetcher: Send + Sync + 'static {
    /// Whether `url` points at a video this fetcher knows how to read.
    fn supports(&self, url: &str) -> bool;

    /// Fetches the transcript, trying caption `languages` in order.
    async fn fetch(&self, url: &str, languages: &[String]) -> Result<Transcript, TranscriptError>;
}

/// Caption languages to try for a project: the style's own language first,
/// then the configured fallbacks.
pub fn preferred_languages(style: LanguageStyle, configured: &[String]) -> Vec<String> {
    let mut languages = vec![style.transcript_language().to_string()];
    for code in configured {
        if !languages.contains(code) {
            languages.push(code.clone());
        }
    }
    languages
}

/// Extracts the 11 character video id from the YouTube URL forms people paste.
pub fn video_id_from_url(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let candidate = match host {
        "youtu.be" => parsed.path_segments()?.next().map(str::to_string),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" => {
            let mut segments = parsed.path_segments()?;
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("shorts") | Some("embed") | Some("live") | Some("v") => {
                    segments.next().map(str::to_string)
                }
                _ => None,
            }
        }
        _ => None,
    }?;

    is_video_id(&candidate).then_some(candidate)
}

fn is_video_id(value: &str) -> bool {
    value.len() == VIDEO_ID_LEN
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}
