use axum::{extract::State, Json};
use chrono::Utc;
use diesel::prelude::*;

use crate::{
    auth::AuthenticatedUser,
    contract::{ContentEditRequest, ContentResponse},
    error::{AppError, AppResult},
    models::GeneratedContent,
    pipeline::to_content_response,
    schema::{generated_content, projects},
    state::AppState,
};

pub async fn edit_content(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ContentEditRequest>,
) -> AppResult<Json<ContentResponse>> {
    if payload.new_text.trim().is_empty() {
        return Err(AppError::bad_request("new_text must not be empty"));
    }

    let mut conn = state.db()?;

    let owned: GeneratedContent = generated_content::table
        .inner_join(projects::table)
        .filter(generated_content::id.eq(payload.content_id))
        .filter(projects::user_id.eq(user.user_id))
        .select(generated_content::all_columns)
        .first(&mut conn)?;

    let updated: GeneratedContent = diesel::update(generated_content::table.find(owned.id))
        .set((
            generated_content::content_body.eq(&payload.new_text),
            generated_content::edited_at.eq(Some(Utc::now().naive_utc())),
        ))
        .get_result(&mut conn)?;

    tracing::info!(
        content_id = updated.id,
        project_id = updated.project_id,
        platform = %updated.platform,
        "content edited"
    );
    Ok(Json(to_content_response(updated)))
}
