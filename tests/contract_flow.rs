mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use common::{empty_request, json_request, offline_router, read_json, send};
use serde_json::{json, Value};

#[tokio::test]
async fn root_reports_running() -> Result<()> {
    let router = offline_router()?;

    let response = send(&router, empty_request(Method::GET, "/", None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await?;
    assert_eq!(
        body,
        json!({"message": "Nuvoletro Backend is Running!", "status": "healthy"})
    );
    Ok(())
}

#[tokio::test]
async fn legacy_health_is_always_disconnected() -> Result<()> {
    let router = offline_router()?;

    let response = send(&router, empty_request(Method::GET, "/health", None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await?;
    assert_eq!(
        body,
        json!({"database": "disconnected", "redis": "disconnected"})
    );
    Ok(())
}

#[tokio::test]
async fn generate_returns_the_fixed_mock() -> Result<()> {
    let router = offline_router()?;

    let payload = json!({
        "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "platforms": ["instagram", "veo_prompt", "blog"],
        "language_style": "en",
    });
    let response = send(&router, json_request(Method::POST, "/generate", &payload, None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await?;
    assert_eq!(
        body,
        json!({
            "id": 101,
            "video_title": "Mock Video Title",
            "youtube_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "generated_content": [],
            "status": "processing",
        })
    );
    Ok(())
}

#[tokio::test]
async fn generate_accepts_defaults_and_any_url() -> Result<()> {
    let router = offline_router()?;

    let payload = json!({ "url": "not even a link" });
    let response = send(&router, json_request(Method::POST, "/generate", &payload, None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await?;
    assert_eq!(body["id"], 101);
    assert_eq!(body["youtube_url"], "not even a link");
    Ok(())
}

#[tokio::test]
async fn generate_without_url_is_unprocessable() -> Result<()> {
    let router = offline_router()?;

    let payload = json!({ "platforms": ["linkedin"] });
    let response = send(&router, json_request(Method::POST, "/generate", &payload, None)?).await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let payload = json!({ "url": "https://youtu.be/dQw4w9WgXcQ", "platforms": "linkedin" });
    let response = send(&router, json_request(Method::POST, "/generate", &payload, None)?).await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn generate_accepts_any_language_style_tag() -> Result<()> {
    let router = offline_router()?;

    for style in ["fr", "EN", "roman-urdu"] {
        let payload = json!({ "url": "https://youtu.be/dQw4w9WgXcQ", "language_style": style });
        let response =
            send(&router, json_request(Method::POST, "/generate", &payload, None)?).await?;
        assert_eq!(response.status(), StatusCode::OK, "style {style}");
        let body: Value = read_json(response).await?;
        assert_eq!(body["id"], 101);
        assert_eq!(body["video_title"], "Mock Video Title");
    }
    Ok(())
}

#[tokio::test]
async fn api_health_reports_unreachable_database() -> Result<()> {
    let router = offline_router()?;

    let response = send(&router, empty_request(Method::GET, "/api/health", None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "disconnected");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[tokio::test]
async fn project_routes_require_a_token() -> Result<()> {
    let router = offline_router()?;

    let response = send(&router, empty_request(Method::GET, "/api/projects", None)?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &router,
        empty_request(Method::GET, "/api/projects/1", Some("not-a-jwt"))?,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = read_json(response).await?;
    assert_eq!(body["error"], "unauthorized");
    Ok(())
}
