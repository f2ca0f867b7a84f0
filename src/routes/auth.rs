use axum::{extract::State, http::StatusCode, Json};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{password, AuthenticatedUser},
    error::{AppError, AppResult},
    models::{NewUser, User},
    schema::users::{self, dsl},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> AppResult<(StatusCode, Json<LoginResponse>)> {
    let email = normalize_email(&payload.email);
    if !looks_like_email(&email) {
        return Err(AppError::bad_request("email address is invalid"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let hashed_password = password::hash_password(&payload.password)?;
    let mut conn = state.db()?;

    let user: User = diesel::insert_into(users::table)
        .values(&NewUser {
            email,
            hashed_password,
        })
        .get_result(&mut conn)
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                AppError::bad_request("email already registered")
            }
            other => AppError::from(other),
        })?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(issue_token(&state, &user)?)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> AppResult<Json<LoginResponse>> {
    let mut conn = state.db()?;

    let user: User = dsl::users
        .filter(dsl::email.eq(normalize_email(&payload.email)))
        .first(&mut conn)
        .map_err(|err| match err {
            DieselError::NotFound => AppError::unauthorized(),
            other => AppError::from(other),
        })?;

    let valid = password::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| AppError::unauthorized())?;

    if !valid {
        return Err(AppError::unauthorized());
    }

    Ok(Json(issue_token(&state, &user)?))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}

fn issue_token(state: &AppState, user: &User) -> AppResult<LoginResponse> {
    let access_token = state.jwt.generate_token(user.id, &user.email)?;
    Ok(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.expires_in_seconds(),
    })
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
