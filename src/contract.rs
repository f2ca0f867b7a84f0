//! Request and response shapes shared by the HTTP surface and the pipeline.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub const MAX_PLATFORMS: usize = 10;
pub const MAX_PLATFORM_LEN: usize = 32;

/// Language register of the generated copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LanguageStyle {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ur")]
    Urdu,
    /// Urdu written in Latin script, freely mixed with English.
    #[default]
    #[serde(rename = "ur-en")]
    RomanUrdu,
}

impl LanguageStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageStyle::English => "en",
            LanguageStyle::Urdu => "ur",
            LanguageStyle::RomanUrdu => "ur-en",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "en" => Some(LanguageStyle::English),
            "ur" => Some(LanguageStyle::Urdu),
            "ur-en" => Some(LanguageStyle::RomanUrdu),
            _ => None,
        }
    }

    /// Caption language to try first when fetching a transcript for this style.
    pub fn transcript_language(&self) -> &'static str {
        match self {
            LanguageStyle::English => "en",
            LanguageStyle::Urdu | LanguageStyle::RomanUrdu => "ur",
        }
    }
}

impl fmt::Display for LanguageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Processing,
    Completed,
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Processing => "processing",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "processing" => Some(ProjectStatus::Processing),
            "completed" => Some(ProjectStatus::Completed),
            "failed" => Some(ProjectStatus::Failed),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: ProjectStatus) -> bool {
        matches!(
            (self, next),
            (ProjectStatus::Processing, ProjectStatus::Completed)
                | (ProjectStatus::Processing, ProjectStatus::Failed)
                | (ProjectStatus::Failed, ProjectStatus::Processing)
        )
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_platforms() -> Vec<String> {
    vec!["linkedin".to_string(), "twitter".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRequest {
    pub url: String,
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub language_style: LanguageStyle,
}

/// A `VideoRequest` whose URL parsed and whose platform list is normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedVideoRequest {
    pub url: String,
    pub platforms: Vec<String>,
    pub language_style: LanguageStyle,
}

impl VideoRequest {
    pub fn validate(self) -> Result<ValidatedVideoRequest, String> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err("url must not be empty".into());
        }
        let parsed = Url::parse(url).map_err(|_| "url must be an absolute URL".to_string())?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err("url must use http or https".into());
        }

        let platforms = normalize_platforms(&self.platforms)?;

        Ok(ValidatedVideoRequest {
            url: url.to_string(),
            platforms,
            language_style: self.language_style,
        })
    }
}

pub fn normalize_platforms(raw: &[String]) -> Result<Vec<String>, String> {
    let mut platforms: Vec<String> = Vec::with_capacity(raw.len());
    for value in raw {
        let platform = value.trim().to_lowercase();
        if platform.is_empty() {
            return Err("platform names must not be empty".into());
        }
        if platform.chars().count() > MAX_PLATFORM_LEN {
            return Err(format!(
                "platform `{platform}` exceeds {MAX_PLATFORM_LEN} characters"
            ));
        }
        if !platform
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '-')
        {
            return Err(format!(
                "platform `{platform}` may only contain a-z, 0-9, `_` and `-`"
            ));
        }
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }

    if platforms.is_empty() {
        return Err("at least one platform is required".into());
    }
    if platforms.len() > MAX_PLATFORMS {
        return Err(format!("at most {MAX_PLATFORMS} platforms may be requested"));
    }
    Ok(platforms)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEditRequest {
    pub content_id: i32,
    pub new_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentResponse {
    pub id: i32,
    pub platform: String,
    pub body: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectResponse {
    pub id: i32,
    pub video_title: String,
    pub youtube_url: String,
    pub generated_content: Vec<ContentResponse>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectProgress {
    pub requested: usize,
    pub generated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDetailResponse {
    #[serde(flatten)]
    pub project: ProjectResponse,
    pub platforms: Vec<String>,
    pub language_style: String,
    pub error: Option<String>,
    pub progress: ProjectProgress,
    pub created_at: String,
    pub updated_at: String,
}

pub fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
