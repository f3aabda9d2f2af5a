pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{header, Request, StatusCode},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
    pub config: config::Config,
}

/// Full HTTP application: the JSON API under `/api` plus the SPA fallback.
pub fn app(state: AppState) -> Router {
    // Every /users route is admin only
    let admin_routes = Router::new()
        .nest("/users", routes::users::router())
        .route_layer(axum_middleware::from_fn(middleware::auth::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let api_router = Router::new()
        .route("/health", get(health_check))
        .nest("/auth", routes::auth::router())
        .nest("/reports", routes::reports::router())
        .nest("/stats", routes::stats::router())
        .merge(admin_routes)
        .fallback(api_not_found);

    Router::new()
        .nest("/api", api_router)
        .fallback(serve_spa)
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": db::now() }))
}

async fn api_not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

async fn serve_spa(State(state): State<AppState>, req: Request<Body>) -> Response {
    let static_dir = std::path::Path::new(&state.config.static_dir);
    let path = req.uri().path().trim_start_matches('/');

    // Try to serve static file first
    if !path.is_empty() && static_dir.join(path).is_file() {
        return match ServeDir::new(static_dir).oneshot(req).await {
            Ok(res) => res.into_response(),
            Err(never) => match never {},
        };
    }

    // For SPA routes, serve index.html
    match tokio::fs::read(static_dir.join("index.html")).await {
        Ok(contents) => ([(header::CONTENT_TYPE, "text/html")], contents).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}
