use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use tracing::info;

use super::{
    fail_and_report, retry_or_fail, retry_or_fail_project, with_connection, JobExecution,
    JobHandler, ProjectPayload,
};
use crate::{
    contract::{LanguageStyle, ProjectStatus},
    jobs::{enqueue_job, project_payload, JOB_FETCH_TRANSCRIPT, JOB_GENERATE_CONTENT},
    models::{Job, Project},
    pipeline::{project_status, store_transcript},
    schema::projects,
    state::AppState,
    transcript::preferred_languages,
};

pub struct FetchTranscriptJob;

impl FetchTranscriptJob {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl JobHandler for FetchTranscriptJob {
    fn job_type(&self) -> &'static str {
        JOB_FETCH_TRANSCRIPT
    }

    async fn handle(&self, state: Arc<AppState>, job: Job) -> JobExecution {
        let payload: ProjectPayload = match serde_json::from_value(job.payload.clone()) {
            Ok(payload) => payload,
            Err(err) => {
                return JobExecution::Failed {
                    error: format!("invalid transcript payload: {err}"),
                }
            }
        };
        let project_id = payload.project_id;

        let project = match with_connection(&state, move |conn| {
            Ok(projects::table
                .find(project_id)
                .first::<Project>(conn)
                .optional()?)
        })
        .await
        {
            Ok(Some(project)) => project,
            Ok(None) => {
                return JobExecution::Failed {
                    error: format!("project {project_id} not found"),
                }
            }
            Err(error) => return retry_or_fail(&job, state.config.job_max_attempts, error),
        };

        if project_status(&project) != ProjectStatus::Processing {
            info!(project_id, status = %project.status, "project no longer processing, skipping transcript");
            return JobExecution::Success;
        }

        if project.transcript_text.is_some() {
            return match with_connection(&state, move |conn| {
                enqueue_job(conn, JOB_GENERATE_CONTENT, project_payload(project_id), None)?;
                Ok(())
            })
            .await
            {
                Ok(()) => JobExecution::Success,
                Err(error) => retry_or_fail_project(&state, &job, project_id, error).await,
            };
        }

        let style = LanguageStyle::parse(&project.language_style).unwrap_or_default();
        let languages = preferred_languages(style, &state.config.transcript_languages);

        let failure = match state.transcripts.fetch(&project.youtube_url, &languages).await {
            Ok(transcript) => {
                let text = transcript.text();
                if text.is_empty() {
                    "transcript is empty".to_string()
                } else {
                    info!(
                        project_id,
                        video_id = %transcript.video_id,
                        language = %transcript.language,
                        segments = transcript.segments.len(),
                        "transcript fetched"
                    );
                    let title = transcript.title;
                    return match with_connection(&state, move |conn| {
                        store_transcript(conn, project_id, &title, &text)
                    })
                    .await
                    {
                        Ok(true) => JobExecution::Success,
                        Ok(false) => {
                            info!(project_id, "project left processing while fetching transcript");
                            JobExecution::Success
                        }
                        Err(error) => {
                            retry_or_fail_project(&state, &job, project_id, error).await
                        }
                    };
                }
            }
            Err(err) if err.is_retryable() => {
                return retry_or_fail_project(&state, &job, project_id, err.to_string()).await;
            }
            Err(err) => err.to_string(),
        };

        fail_and_report(&state, &job, project_id, failure).await
    }
}
