use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    db::PgPool,
    error::{AppError, AppResult},
    generation::{chat::ChatCompletionGenerator, ContentGenerator},
    transcript::{youtube::YoutubeTranscriptFetcher, TranscriptFetcher},
};

pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub jwt: JwtService,
    pub transcripts: Arc<dyn TranscriptFetcher>,
    pub generator: Arc<dyn ContentGenerator>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        jwt: JwtService,
        transcripts: Arc<dyn TranscriptFetcher>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            jwt,
            transcripts,
            generator,
        }
    }

    /// Wires the production YouTube fetcher and chat-completions generator.
    pub fn from_config(pool: PgPool, config: AppConfig) -> anyhow::Result<Self> {
        let jwt = JwtService::from_config(&config)?;
        let transcripts = Arc::new(YoutubeTranscriptFetcher::from_config(&config)?);
        let generator = Arc::new(ChatCompletionGenerator::from_config(&config)?);
        Ok(Self::new(pool, config, jwt, transcripts, generator))
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }
}
