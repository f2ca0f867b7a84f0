use std::env;

use anyhow::{Context, Result};
use url::Url;

use crate::db::DEFAULT_MAX_POOL_SIZE;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_expiry_minutes: i64,
    pub cors_allowed_origin: Option<String>,
    pub youtube_oembed_url: String,
    pub youtube_timedtext_url: String,
    pub transcript_languages: Vec<String>,
    pub llm_api_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_transcript_chars: usize,
    pub http_timeout_seconds: u64,
    pub generation_concurrency: usize,
    pub job_max_attempts: i32,
    pub worker_poll_interval_ms: u64,
    pub embedded_worker: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "nuvoletro".to_string());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "nuvoletro-clients".to_string());
        let jwt_expiry_minutes = env::var("JWT_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("JWT_EXPIRY_MINUTES must be an integer")?;
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let youtube_oembed_url = env::var("YOUTUBE_OEMBED_URL")
            .unwrap_or_else(|_| "https://www.youtube.com/oembed".to_string());
        let youtube_timedtext_url = env::var("YOUTUBE_TIMEDTEXT_URL")
            .unwrap_or_else(|_| "https://video.google.com/timedtext".to_string());
        let transcript_languages = parse_language_list(
            &env::var("TRANSCRIPT_LANGUAGES").unwrap_or_else(|_| "en,ur".to_string()),
        );
        let llm_api_url = env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
        let llm_api_key = env::var("LLM_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let llm_model = env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let llm_temperature = env::var("LLM_TEMPERATURE")
            .unwrap_or_else(|_| "0.7".to_string())
            .parse()
            .context("LLM_TEMPERATURE must be a number")?;
        let llm_max_transcript_chars = env::var("LLM_MAX_TRANSCRIPT_CHARS")
            .unwrap_or_else(|_| "12000".to_string())
            .parse()
            .context("LLM_MAX_TRANSCRIPT_CHARS must be a positive integer")?;
        let http_timeout_seconds = env::var("HTTP_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("HTTP_TIMEOUT_SECONDS must be a positive integer")?;
        let generation_concurrency = env::var("GENERATION_CONCURRENCY")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(3)
            .max(1);
        let job_max_attempts = env::var("JOB_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("JOB_MAX_ATTEMPTS must be an integer")?;
        let worker_poll_interval_ms = env::var("WORKER_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "2000".to_string())
            .parse()
            .context("WORKER_POLL_INTERVAL_MS must be a positive integer")?;
        let embedded_worker = env::var("EMBEDDED_WORKER")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            jwt_expiry_minutes,
            cors_allowed_origin,
            youtube_oembed_url,
            youtube_timedtext_url,
            transcript_languages,
            llm_api_url,
            llm_api_key,
            llm_model,
            llm_temperature,
            llm_max_transcript_chars,
            http_timeout_seconds,
            generation_concurrency,
            job_max_attempts,
            worker_poll_interval_ms,
            embedded_worker,
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            let _ = parsed.set_password(Some("*****"));
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}

fn parse_language_list(raw: &str) -> Vec<String> {
    let mut languages: Vec<String> = Vec::new();
    for code in raw.split(',') {
        let code = code.trim().to_ascii_lowercase();
        if !code.is_empty() && !languages.contains(&code) {
            languages.push(code);
        }
    }
    languages
}
