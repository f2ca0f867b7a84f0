use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod auth;
pub mod content;
pub mod generate;
pub mod health;
pub mod projects;

const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let projects_routes = Router::new()
        .route(
            "/",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/:id", get(projects::get_project))
        .route("/:id/retry", post(projects::retry_project));

    let content_routes = Router::new().route("/edit", post(content::edit_content));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/projects", projects_routes)
        .nest("/api/content", content_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::legacy_health))
        .route("/generate", post(generate::generate_mock))
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let allow_origin = match allowed_origins {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(_) => {
                        tracing::warn!(origin = value, "ignoring invalid CORS allowed origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
