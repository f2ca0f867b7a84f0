use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use diesel::pg::PgConnection;
use serde::Deserialize;
use tokio::{task, time::sleep};
use tracing::{error, info, warn};

use crate::{
    jobs::{mark_job_failed, mark_job_succeeded, reserve_job, retry_job_after, JobQueueError},
    models::Job,
    pipeline::{fail_project, PipelineError},
    state::AppState,
};

pub mod generate;
pub mod transcript;

const RETRY_BASE_DELAY: Duration = Duration::from_secs(15);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(600);

#[derive(Debug)]
pub enum JobExecution {
    Success,
    Retry { delay: Duration, error: String },
    Failed { error: String },
}

#[async_trait]
pub trait JobHandler: Send + Sync {
    fn job_type(&self) -> &'static str;
    async fn handle(&self, state: Arc<AppState>, job: Job) -> JobExecution;
}

/// Payload shared by every project job.
#[derive(Debug, Deserialize)]
pub(crate) struct ProjectPayload {
    pub project_id: i32,
}

/// Runs diesel work on the blocking pool with a pooled connection.
pub(crate) async fn with_connection<T, F>(state: &Arc<AppState>, work: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, PipelineError> + Send + 'static,
{
    let state = state.clone();
    task::spawn_blocking(move || {
        let mut conn = state.db().map_err(|err| format!("{err:?}"))?;
        work(&mut conn).map_err(|err| err.to_string())
    })
    .await
    .map_err(|join_err| format!("worker panicked: {join_err}"))?
}

/// Marks the project failed and reports the job as failed with the same
/// message. The job is retried when the failure could not be recorded.
pub(crate) async fn fail_and_report(
    state: &Arc<AppState>,
    job: &Job,
    project_id: i32,
    error: String,
) -> JobExecution {
    let message = error.clone();
    let result = with_connection(state, move |conn| {
        match fail_project(conn, project_id, &message) {
            Ok(_) | Err(PipelineError::InvalidTransition { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    })
    .await;

    match result {
        Ok(()) => JobExecution::Failed { error },
        Err(db_error) => {
            warn!(project_id, error = %db_error, "failed to record project failure");
            retry_or_fail(job, state.config.job_max_attempts, format!("{error}; {db_error}"))
        }
    }
}

/// Retries while the job has attempts left, otherwise fails it.
pub(crate) fn retry_or_fail(job: &Job, max_attempts: i32, error: String) -> JobExecution {
    if job.attempts < max_attempts {
        JobExecution::Retry {
            delay: retry_delay(job.attempts),
            error,
        }
    } else {
        JobExecution::Failed { error }
    }
}

/// Like [`retry_or_fail`], but the project is marked failed once attempts
/// run out so it does not stay in processing.
pub(crate) async fn retry_or_fail_project(
    state: &Arc<AppState>,
    job: &Job,
    project_id: i32,
    error: String,
) -> JobExecution {
    if job.attempts < state.config.job_max_attempts {
        JobExecution::Retry {
            delay: retry_delay(job.attempts),
            error,
        }
    } else {
        fail_and_report(state, job, project_id, error).await
    }
}

/// Backoff before the next attempt: 15s doubled per attempt, capped at ten
/// minutes.
pub fn retry_delay(attempt: i32) -> Duration {
    let exponent = attempt.saturating_sub(1).clamp(0, 16) as u32;
    RETRY_BASE_DELAY
        .saturating_mul(2u32.saturating_pow(exponent))
        .min(RETRY_MAX_DELAY)
}

pub struct Worker {
    state: Arc<AppState>,
    handlers: HashMap<&'static str, Arc<dyn JobHandler>>,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(
        state: Arc<AppState>,
        handlers: Vec<Arc<dyn JobHandler>>,
        poll_interval: Duration,
    ) -> Self {
        let map = handlers
            .into_iter()
            .map(|handler| (handler.job_type(), handler))
            .collect();
        Self {
            state,
            handlers: map,
            poll_interval,
        }
    }

    pub async fn run(&self) {
        info!(poll_interval_ms = self.poll_interval.as_millis() as u64, "worker started");
        loop {
            match self.tick().await {
                Ok(true) => {}
                Ok(false) => sleep(self.poll_interval).await,
                Err(err) => {
                    error!(error = %err, "worker tick failed");
                    sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Reserves and runs at most one job. Returns `false` when nothing was
    /// due.
    pub async fn tick(&self) -> Result<bool, JobQueueError> {
        let job_types: Vec<&str> = self.handlers.keys().copied().collect();
        if job_types.is_empty() {
            return Ok(false);
        }

        let mut conn = match self.state.db() {
            Ok(conn) => conn,
            Err(err) => {
                error!(?err, "failed to obtain database connection in worker");
                return Ok(false);
            }
        };

        let job_opt = reserve_job(&mut conn, &job_types)?;
        drop(conn);

        let Some(job) = job_opt else {
            return Ok(false);
        };

        let Some(handler) = self.handlers.get(job.job_type.as_str()) else {
            error!(job_type = %job.job_type, "no handler registered for job type");
            if let Ok(mut conn) = self.state.db() {
                mark_job_failed(&mut conn, job.id, "no handler registered")?;
            } else {
                error!("failed to mark job failed for missing handler due to pool error");
            }
            return Ok(true);
        };

        match handler.handle(self.state.clone(), job.clone()).await {
            JobExecution::Success => {
                if let Ok(mut conn) = self.state.db() {
                    mark_job_succeeded(&mut conn, job.id)?;
                    info!(job_id = %job.id, job_type = %job.job_type, attempts = job.attempts, "job completed successfully");
                } else {
                    error!("failed to mark job succeeded due to pool error");
                }
            }
            JobExecution::Retry { delay, error } => {
                warn!(
                    job_id = %job.id,
                    job_type = %job.job_type,
                    attempts = job.attempts,
                    delay_secs = delay.as_secs(),
                    %error,
                    "job will retry"
                );
                if let Ok(mut conn) = self.state.db() {
                    retry_job_after(&mut conn, job.id, delay, &error)?;
                } else {
                    error!("failed to requeue job for retry due to pool error");
                }
            }
            JobExecution::Failed { error } => {
                error!(job_id = %job.id, job_type = %job.job_type, %error, "job failed");
                if let Ok(mut conn) = self.state.db() {
                    mark_job_failed(&mut conn, job.id, &error)?;
                } else {
                    error!("failed to mark job failed due to pool error");
                }
            }
        }
        Ok(true)
    }
}

pub fn default_handlers() -> Vec<Arc<dyn JobHandler>> {
    vec![
        Arc::new(transcript::FetchTranscriptJob::new()),
        Arc::new(generate::GenerateContentJob::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_until_capped() {
        assert_eq!(retry_delay(1), Duration::from_secs(15));
        assert_eq!(retry_delay(2), Duration::from_secs(30));
        assert_eq!(retry_delay(4), Duration::from_secs(120));
        assert_eq!(retry_delay(6), Duration::from_secs(480));
        assert_eq!(retry_delay(7), Duration::from_secs(600));
        assert_eq!(retry_delay(40), Duration::from_secs(600));
    }

    #[test]
    fn retry_delay_treats_unstarted_jobs_as_first_attempt() {
        assert_eq!(retry_delay(0), Duration::from_secs(15));
        assert_eq!(retry_delay(-3), Duration::from_secs(15));
    }

    #[test]
    fn default_handlers_cover_both_stages() {
        let mut types: Vec<&str> = default_handlers().iter().map(|h| h.job_type()).collect();
        types.sort();
        assert_eq!(types, vec!["fetch-transcript", "generate-content"]);
    }

    fn job_with_attempts(attempts: i32) -> Job {
        let now = chrono::Utc::now().naive_utc();
        Job {
            id: uuid::Uuid::new_v4(),
            job_type: "generate-content".into(),
            payload: serde_json::json!({"project_id": 1}),
            status: "running".into(),
            attempts,
            run_after: now,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn retry_or_fail_stops_at_max_attempts() {
        match retry_or_fail(&job_with_attempts(2), 3, "db down".into()) {
            JobExecution::Retry { delay, error } => {
                assert_eq!(delay, Duration::from_secs(30));
                assert_eq!(error, "db down");
            }
            other => panic!("expected retry, got {other:?}"),
        }
        assert!(matches!(
            retry_or_fail(&job_with_attempts(3), 3, "db down".into()),
            JobExecution::Failed { error } if error == "db down"
        ));
    }
}
