//! Project lifecycle: submission, stage hand-off between jobs, status
//! transitions and the read model returned to clients.
//!
//! A project starts in `processing` with a `fetch-transcript` job queued.
//! Storing the transcript queues `generate-content`; the generation job
//! records one body per requested platform and finally completes or fails
//! the project. Every stage hand-off happens in the same transaction as the
//! state change it follows, so a crash never leaves a project without work
//! queued.

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use thiserror::Error;

use crate::contract::{
    to_iso, ContentResponse, ProjectDetailResponse, ProjectProgress, ProjectResponse,
    ProjectStatus, ValidatedVideoRequest,
};
use crate::jobs::{
    enqueue_job, project_payload, JobQueueError, JOB_FETCH_TRANSCRIPT, JOB_GENERATE_CONTENT,
};
use crate::models::{GeneratedContent, NewGeneratedContent, NewProject, Project};
use crate::schema::{generated_content, projects};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("job queue error: {0}")]
    Queue(#[from] JobQueueError),
    #[error("platform `{platform}` was not requested for project {project_id}")]
    UnrequestedPlatform { project_id: i32, platform: String },
    #[error("project cannot move from {from} to {to}")]
    InvalidTransition {
        from: ProjectStatus,
        to: ProjectStatus,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

pub fn project_status(project: &Project) -> ProjectStatus {
    ProjectStatus::parse(&project.status).unwrap_or(ProjectStatus::Failed)
}

pub fn submit_project(
    conn: &mut PgConnection,
    owner_id: i32,
    request: &ValidatedVideoRequest,
) -> PipelineResult<Project> {
    conn.transaction(|conn| {
        let project: Project = diesel::insert_into(projects::table)
            .values(&NewProject {
                user_id: owner_id,
                youtube_url: request.url.clone(),
                platforms: request.platforms.clone(),
                language_style: request.language_style.as_str().to_string(),
                status: ProjectStatus::Processing.as_str().to_string(),
            })
            .get_result(conn)?;

        enqueue_job(conn, JOB_FETCH_TRANSCRIPT, project_payload(project.id), None)?;
        Ok(project)
    })
}

/// Saves the fetched title and transcript and queues generation. Returns
/// `false` without queuing anything when the project is no longer
/// processing.
pub fn store_transcript(
    conn: &mut PgConnection,
    project_id: i32,
    title: &str,
    transcript: &str,
) -> PipelineResult<bool> {
    conn.transaction(|conn| {
        let updated = diesel::update(
            projects::table
                .find(project_id)
                .filter(projects::status.eq(ProjectStatus::Processing.as_str())),
        )
        .set((
            projects::video_title.eq(Some(title)),
            projects::transcript_text.eq(Some(transcript)),
            projects::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;

        if updated == 0 {
            return Ok(false);
        }

        enqueue_job(conn, JOB_GENERATE_CONTENT, project_payload(project_id), None)?;
        Ok(true)
    })
}

/// Requested platforms that have no stored body yet, in request order.
pub fn pending_platforms(requested: &[String], generated: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|platform| !generated.contains(platform))
        .cloned()
        .collect()
}

pub fn generated_platforms(conn: &mut PgConnection, project_id: i32) -> PipelineResult<Vec<String>> {
    Ok(generated_content::table
        .filter(generated_content::project_id.eq(project_id))
        .select(generated_content::platform)
        .load(conn)?)
}

/// Stores one platform body. Only platforms the project asked for are
/// accepted; a second body for the same platform is ignored and reported as
/// `false`.
pub fn record_generated_content(
    conn: &mut PgConnection,
    project: &Project,
    platform: &str,
    body: &str,
) -> PipelineResult<bool> {
    if !project.platforms.iter().any(|requested| requested == platform) {
        return Err(PipelineError::UnrequestedPlatform {
            project_id: project.id,
            platform: platform.to_string(),
        });
    }

    let inserted = diesel::insert_into(generated_content::table)
        .values(&NewGeneratedContent {
            project_id: project.id,
            platform: platform.to_string(),
            content_body: body.to_string(),
        })
        .on_conflict((generated_content::project_id, generated_content::platform))
        .do_nothing()
        .execute(conn)?;
    Ok(inserted > 0)
}

fn transition(
    conn: &mut PgConnection,
    project_id: i32,
    to: ProjectStatus,
    error_message: Option<&str>,
) -> PipelineResult<Project> {
    conn.transaction(|conn| {
        let project: Project = projects::table
            .find(project_id)
            .for_update()
            .first(conn)?;
        let from = project_status(&project);
        if !from.can_transition_to(to) {
            return Err(PipelineError::InvalidTransition { from, to });
        }

        let updated = diesel::update(projects::table.find(project_id))
            .set((
                projects::status.eq(to.as_str()),
                projects::error_message.eq(error_message),
                projects::updated_at.eq(Utc::now().naive_utc()),
            ))
            .get_result(conn)?;
        Ok(updated)
    })
}

pub fn complete_project(conn: &mut PgConnection, project_id: i32) -> PipelineResult<Project> {
    transition(conn, project_id, ProjectStatus::Completed, None)
}

pub fn fail_project(
    conn: &mut PgConnection,
    project_id: i32,
    error_message: &str,
) -> PipelineResult<Project> {
    transition(conn, project_id, ProjectStatus::Failed, Some(error_message))
}

/// Moves a failed project back to processing and queues the first stage
/// that has not finished yet.
pub fn retry_project(conn: &mut PgConnection, project_id: i32) -> PipelineResult<Project> {
    conn.transaction(|conn| {
        let project = transition(conn, project_id, ProjectStatus::Processing, None)?;
        let job_type = if project.transcript_text.is_some() {
            JOB_GENERATE_CONTENT
        } else {
            JOB_FETCH_TRANSCRIPT
        };
        enqueue_job(conn, job_type, project_payload(project_id), None)?;
        Ok(project)
    })
}

pub fn to_content_response(content: GeneratedContent) -> ContentResponse {
    ContentResponse {
        id: content.id,
        platform: content.platform,
        body: content.content_body,
        created_at: to_iso(content.created_at),
    }
}

/// Builds the client view of a project. Content is ordered the way the
/// platforms were requested.
pub fn project_detail(project: Project, mut contents: Vec<GeneratedContent>) -> ProjectDetailResponse {
    let position = |platform: &str| {
        project
            .platforms
            .iter()
            .position(|requested| requested == platform)
            .unwrap_or(usize::MAX)
    };
    contents.sort_by_key(|content| (position(&content.platform), content.id));

    let generated = contents
        .iter()
        .filter(|content| position(&content.platform) != usize::MAX)
        .count();
    let progress = ProjectProgress {
        requested: project.platforms.len(),
        generated,
    };

    ProjectDetailResponse {
        project: ProjectResponse {
            id: project.id,
            video_title: project.video_title.clone().unwrap_or_default(),
            youtube_url: project.youtube_url.clone(),
            generated_content: contents.into_iter().map(to_content_response).collect(),
            status: project.status.clone(),
        },
        platforms: project.platforms.clone(),
        language_style: project.language_style.clone(),
        error: project.error_message.clone(),
        progress,
        created_at: to_iso(project.created_at),
        updated_at: to_iso(project.updated_at),
    }
}

pub fn load_project_detail(
    conn: &mut PgConnection,
    project: Project,
) -> PipelineResult<ProjectDetailResponse> {
    let contents: Vec<GeneratedContent> = GeneratedContent::belonging_to(&project)
        .order(generated_content::id.asc())
        .load(conn)?;
    Ok(project_detail(project, contents))
}
