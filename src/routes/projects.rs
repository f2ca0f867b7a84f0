use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use tracing::info;

use crate::{
    auth::AuthenticatedUser,
    contract::{ProjectDetailResponse, VideoRequest},
    error::{AppError, AppResult},
    models::{GeneratedContent, Project},
    pipeline,
    schema::{generated_content, projects},
    state::AppState,
};

pub async fn create_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<VideoRequest>,
) -> AppResult<(StatusCode, Json<ProjectDetailResponse>)> {
    let request = payload.validate().map_err(AppError::bad_request)?;
    if !state.transcripts.supports(&request.url) {
        return Err(AppError::bad_request(
            "url must point to a single YouTube video",
        ));
    }

    let mut conn = state.db()?;
    let project = pipeline::submit_project(&mut conn, user.user_id, &request)?;
    info!(
        project_id = project.id,
        user_id = user.user_id,
        platforms = ?project.platforms,
        language_style = %project.language_style,
        "project submitted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(pipeline::project_detail(project, Vec::new())),
    ))
}

pub async fn list_projects(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<ProjectDetailResponse>>> {
    let mut conn = state.db()?;

    let owned: Vec<Project> = projects::table
        .filter(projects::user_id.eq(user.user_id))
        .order((projects::created_at.desc(), projects::id.desc()))
        .load(&mut conn)?;
    let contents: Vec<GeneratedContent> = GeneratedContent::belonging_to(&owned)
        .order(generated_content::id.asc())
        .load(&mut conn)?;
    let grouped = contents.grouped_by(&owned);

    Ok(Json(
        owned
            .into_iter()
            .zip(grouped)
            .map(|(project, contents)| pipeline::project_detail(project, contents))
            .collect(),
    ))
}

pub async fn get_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<i32>,
) -> AppResult<Json<ProjectDetailResponse>> {
    let mut conn = state.db()?;
    let project = load_owned_project(&mut conn, user.user_id, project_id)?;
    Ok(Json(pipeline::load_project_detail(&mut conn, project)?))
}

pub async fn retry_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<i32>,
) -> AppResult<(StatusCode, Json<ProjectDetailResponse>)> {
    let mut conn = state.db()?;
    load_owned_project(&mut conn, user.user_id, project_id)?;

    let project = pipeline::retry_project(&mut conn, project_id)?;
    info!(project_id, user_id = user.user_id, "project retry requested");

    Ok((
        StatusCode::ACCEPTED,
        Json(pipeline::load_project_detail(&mut conn, project)?),
    ))
}

/// Projects belonging to someone else are reported as missing.
fn load_owned_project(
    conn: &mut PgConnection,
    owner_id: i32,
    project_id: i32,
) -> AppResult<Project> {
    Ok(projects::table
        .filter(projects::id.eq(project_id))
        .filter(projects::user_id.eq(owner_id))
        .first(conn)?)
}
