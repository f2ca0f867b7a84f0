use std::{sync::Arc, time::Duration};

use tokio::signal;
use tracing_subscriber::EnvFilter;

use nuvoletro::{config::AppConfig, db, default_handlers, state::AppState, Worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "worker",
        database_url = %config.redacted_database_url(),
        pool_size = 1,
        llm_model = %config.llm_model,
        llm_api_key_set = config.llm_api_key.is_some(),
        generation_concurrency = config.generation_concurrency,
        max_attempts = config.job_max_attempts,
        "loaded backend configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    db::run_migrations(&pool)?;
    let poll_interval = Duration::from_millis(config.worker_poll_interval_ms);

    let state = Arc::new(AppState::from_config(pool, config)?);
    let worker = Worker::new(state, default_handlers(), poll_interval);

    tokio::select! {
        _ = worker.run() => {}
        _ = signal::ctrl_c() => {
            tracing::info!("worker received shutdown signal");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
