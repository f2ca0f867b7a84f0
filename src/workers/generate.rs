use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use futures_util::{stream, StreamExt};
use tracing::{info, warn};

use super::{
    fail_and_report, retry_or_fail, retry_or_fail_project, with_connection, JobExecution,
    JobHandler, ProjectPayload,
};
use crate::{
    contract::{LanguageStyle, ProjectStatus},
    generation::{
        prompt::{enforce_limit, platform_profile},
        GenerationError, GenerationRequest,
    },
    jobs::JOB_GENERATE_CONTENT,
    models::{Job, Project},
    pipeline::{
        complete_project, generated_platforms, pending_platforms, project_status,
        record_generated_content,
    },
    schema::projects,
    state::AppState,
};

pub struct GenerateContentJob;

impl GenerateContentJob {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl JobHandler for GenerateContentJob {
    fn job_type(&self) -> &'static str {
        JOB_GENERATE_CONTENT
    }

    async fn handle(&self, state: Arc<AppState>, job: Job) -> JobExecution {
        let payload: ProjectPayload = match serde_json::from_value(job.payload.clone()) {
            Ok(payload) => payload,
            Err(err) => {
                return JobExecution::Failed {
                    error: format!("invalid generation payload: {err}"),
                }
            }
        };
        let project_id = payload.project_id;

        let loaded = with_connection(&state, move |conn| {
            let project = projects::table
                .find(project_id)
                .first::<Project>(conn)
                .optional()?;
            let generated = match &project {
                Some(_) => generated_platforms(conn, project_id)?,
                None => Vec::new(),
            };
            Ok((project, generated))
        })
        .await;

        let (project, generated) = match loaded {
            Ok((Some(project), generated)) => (project, generated),
            Ok((None, _)) => {
                return JobExecution::Failed {
                    error: format!("project {project_id} not found"),
                }
            }
            Err(error) => return retry_or_fail(&job, state.config.job_max_attempts, error),
        };

        if project_status(&project) != ProjectStatus::Processing {
            info!(project_id, status = %project.status, "project no longer processing, skipping generation");
            return JobExecution::Success;
        }

        let Some(transcript) = project.transcript_text.clone() else {
            return fail_and_report(&state, &job, project_id, "transcript missing".into()).await;
        };

        let pending = pending_platforms(&project.platforms, &generated);
        let outcome = if pending.is_empty() {
            GenerationOutcome::default()
        } else {
            generate_pending(&state, &project, &transcript, pending).await
        };

        if let Some(error) = outcome.storage_error {
            return retry_or_fail_project(&state, &job, project_id, error).await;
        }

        if !outcome.permanent.is_empty() {
            return fail_and_report(&state, &job, project_id, outcome.permanent.join("; ")).await;
        }

        if !outcome.retryable.is_empty() {
            let error = outcome.retryable.join("; ");
            return retry_or_fail_project(&state, &job, project_id, error).await;
        }

        match with_connection(&state, move |conn| complete_project(conn, project_id)).await {
            Ok(_) => {
                info!(project_id, "project completed");
                JobExecution::Success
            }
            Err(error) => retry_or_fail_project(&state, &job, project_id, error).await,
        }
    }
}

#[derive(Debug, Default)]
struct GenerationOutcome {
    permanent: Vec<String>,
    retryable: Vec<String>,
    storage_error: Option<String>,
}

/// Generates every pending platform with bounded concurrency and stores
/// each body as soon as it arrives.
async fn generate_pending(
    state: &Arc<AppState>,
    project: &Project,
    transcript: &str,
    pending: Vec<String>,
) -> GenerationOutcome {
    let style = LanguageStyle::parse(&project.language_style).unwrap_or_default();
    let video_title = project.video_title.as_deref().unwrap_or_default();
    let generator = state.generator.clone();

    let mut results = stream::iter(pending.into_iter().map(|platform| {
        let generator = generator.clone();
        async move {
            let request = GenerationRequest {
                video_title,
                transcript,
                platform: &platform,
                style,
            };
            let result = generator.generate(&request).await.and_then(|body| {
                let body = body.trim().to_string();
                if body.is_empty() {
                    return Err(GenerationError::EmptyCompletion);
                }
                Ok(match platform_profile(&platform).max_chars {
                    Some(limit) => enforce_limit(&body, limit),
                    None => body,
                })
            });
            (platform, result)
        }
    }))
    .buffer_unordered(state.config.generation_concurrency.max(1));

    let mut outcome = GenerationOutcome::default();
    while let Some((platform, result)) = results.next().await {
        match result {
            Ok(body) => {
                let owned = project.clone();
                let stored_platform = platform.clone();
                let stored = with_connection(state, move |conn| {
                    record_generated_content(conn, &owned, &stored_platform, &body)
                })
                .await;
                match stored {
                    Ok(_) => info!(project_id = project.id, %platform, "content generated"),
                    Err(error) => {
                        warn!(project_id = project.id, %platform, %error, "failed to store content");
                        outcome.storage_error.get_or_insert(error);
                    }
                }
            }
            Err(err) if err.is_retryable() => {
                warn!(project_id = project.id, %platform, error = %err, "generation failed, will retry");
                outcome.retryable.push(format!("{platform}: {err}"));
            }
            Err(err) => {
                warn!(project_id = project.id, %platform, error = %err, "generation failed");
                outcome.permanent.push(format!("{platform}: {err}"));
            }
        }
    }
    outcome
}
