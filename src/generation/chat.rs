use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    prompt::{build_messages, clean_completion, enforce_limit, platform_profile, ChatMessage},
    ContentGenerator, GenerationError, GenerationRequest,
};
use crate::config::AppConfig;

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionGenerator {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_transcript_chars: usize,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionGenerator {
    pub fn new(
        client: Client,
        api_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key,
            model: model.into(),
            temperature: 0.7,
            max_transcript_chars: 12_000,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_transcript_chars(mut self, max_chars: usize) -> Self {
        self.max_transcript_chars = max_chars.max(1);
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .context("failed to build generation HTTP client")?;
        Ok(Self::new(
            client,
            config.llm_api_url.clone(),
            config.llm_api_key.clone(),
            config.llm_model.clone(),
        )
        .with_temperature(config.llm_temperature)
        .with_max_transcript_chars(config.llm_max_transcript_chars))
    }
}

#[async_trait]
impl ContentGenerator for ChatCompletionGenerator {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey)?;
        let messages = build_messages(request, self.max_transcript_chars);

        debug!(
            platform = request.platform,
            style = %request.style,
            model = %self.model,
            "requesting chat completion"
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&ChatCompletionRequest {
                model: &self.model,
                messages: &messages,
                temperature: self.temperature,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::UpstreamStatus {
                status,
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::InvalidResponse(err.to_string()))?;
        let raw = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::InvalidResponse("response has no choices".into()))?
            .message
            .content
            .unwrap_or_default();

        let body = clean_completion(&raw).ok_or(GenerationError::EmptyCompletion)?;
        Ok(match platform_profile(request.platform).max_chars {
            Some(limit) => enforce_limit(&body, limit),
            None => body,
        })
    }
}
