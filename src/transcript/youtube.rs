use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{
    timedtext::parse_timedtext, video_id_from_url, Transcript, TranscriptError, TranscriptFetcher,
    TranscriptSegment,
};
use crate::config::AppConfig;

pub struct YoutubeTranscriptFetcher {
    client: Client,
    oembed_url: String,
    timedtext_url: String,
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: String,
}

impl YoutubeTranscriptFetcher {
    pub fn new(
        client: Client,
        oembed_url: impl Into<String>,
        timedtext_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            oembed_url: oembed_url.into(),
            timedtext_url: timedtext_url.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .context("failed to build transcript HTTP client")?;
        Ok(Self::new(
            client,
            config.youtube_oembed_url.clone(),
            config.youtube_timedtext_url.clone(),
        ))
    }

    async fn fetch_title(&self, url: &str) -> Result<String, TranscriptError> {
        let response = self
            .client
            .get(&self.oembed_url)
            .query(&[("url", url), ("format", "json")])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                return Err(TranscriptError::Unavailable(
                    "video is private, removed or does not exist".into(),
                ))
            }
            status => return Err(TranscriptError::UpstreamStatus(status)),
        }

        let body: OEmbedResponse = response
            .json()
            .await
            .map_err(|err| TranscriptError::Parse(format!("invalid oEmbed response: {err}")))?;
        Ok(body.title.trim().to_string())
    }

    async fn fetch_captions(
        &self,
        video_id: &str,
        language: &str,
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        let response = self
            .client
            .get(&self.timedtext_url)
            .query(&[("v", video_id), ("lang", language)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(TranscriptError::UpstreamStatus(status));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        parse_timedtext(&body)
    }
}

#[async_trait]
impl TranscriptFetcher for YoutubeTranscriptFetcher {
    fn supports(&self, url: &str) -> bool {
        video_id_from_url(url).is_some()
    }

    async fn fetch(&self, url: &str, languages: &[String]) -> Result<Transcript, TranscriptError> {
        let video_id =
            video_id_from_url(url).ok_or_else(|| TranscriptError::InvalidUrl(url.to_string()))?;
        let title = self.fetch_title(url).await?;

        for language in languages {
            let segments = self.fetch_captions(&video_id, language).await?;
            if segments.is_empty() {
                debug!(%video_id, %language, "no captions for language");
                continue;
            }
            return Ok(Transcript {
                video_id,
                title,
                language: language.clone(),
                segments,
            });
        }

        Err(TranscriptError::Unavailable(format!(
            "no captions found in languages [{}]",
            languages.join(", ")
        )))
    }
}
