use axum::{extract::State, http::StatusCode, response::Json};
use diesel::{sql_query, RunQueryDsl};
use serde_json::json;
use tokio::task;

use crate::state::AppState;

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Nuvoletro Backend is Running!",
        "status": "healthy",
    }))
}

/// Compatibility endpoint. Always reports both dependencies as disconnected;
/// `/api/health` performs the real check.
pub async fn legacy_health() -> Json<serde_json::Value> {
    Json(json!({
        "database": "disconnected",
        "redis": "disconnected",
    }))
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let pool = state.pool.clone();
    let connected = task::spawn_blocking(move || {
        pool.get()
            .ok()
            .and_then(|mut conn| sql_query("SELECT 1").execute(&mut conn).ok())
            .is_some()
    })
    .await
    .unwrap_or(false);

    if !connected {
        tracing::warn!("health check could not reach the database");
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "database": if connected { "connected" } else { "disconnected" },
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
