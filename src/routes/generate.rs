use axum::Json;
use serde::Deserialize;

use crate::contract::{LanguageStyle, ProjectResponse, ProjectStatus};

const MOCK_PROJECT_ID: i32 = 101;
const MOCK_VIDEO_TITLE: &str = "Mock Video Title";

/// Body accepted by the mock endpoint. Older clients send free-form style
/// tags, so `language_style` stays a plain string here.
#[derive(Debug, Deserialize)]
pub struct MockVideoRequest {
    pub url: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default = "default_language_style")]
    pub language_style: String,
}

fn default_language_style() -> String {
    LanguageStyle::default().as_str().to_string()
}

/// Fixed response used by clients wired against the first contract. The
/// request is only echoed back; no project is created.
pub async fn generate_mock(Json(request): Json<MockVideoRequest>) -> Json<ProjectResponse> {
    tracing::debug!(
        platforms = request.platforms.len(),
        language_style = %request.language_style,
        "mock generate request"
    );
    Json(ProjectResponse {
        id: MOCK_PROJECT_ID,
        video_title: MOCK_VIDEO_TITLE.to_string(),
        youtube_url: request.url,
        generated_content: Vec::new(),
        status: ProjectStatus::Processing.as_str().to_string(),
    })
}
