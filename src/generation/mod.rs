//! Platform copy generation from a transcript.

pub mod chat;
pub mod prompt;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::contract::LanguageStyle;

#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub video_title: &'a str,
    pub transcript: &'a str,
    pub platform: &'a str,
    pub style: LanguageStyle,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no API key configured for the generation backend")]
    MissingApiKey,
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generation backend responded with {status}: {body}")]
    UpstreamStatus { status: StatusCode, body: String },
    #[error("unexpected generation response: {0}")]
    InvalidResponse(String),
    #[error("generation backend returned no content")]
    EmptyCompletion,
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Http(_) => true,
            GenerationError::UpstreamStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            GenerationError::MissingApiKey
            | GenerationError::InvalidResponse(_)
            | GenerationError::EmptyCompletion => false,
        }
    }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync + 'static {
    /// Produces the finished body for one platform. Implementations return
    /// text that already fits the platform's character limit.
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError>;
}
