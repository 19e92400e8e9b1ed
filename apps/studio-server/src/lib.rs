//! Studio server
//! Login, project storage and the public embed feed for interactive video projects

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use parking_lot::Mutex;
use project::ProjectDb;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use api::ApiError;
pub use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<ProjectDb>>,
    pub session_ttl: chrono::Duration,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(db: ProjectDb, config: &ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            session_ttl: config.session_ttl(),
            secure_cookies: config.secure_cookies,
        }
    }
}

pub fn router(state: AppState) -> Router {
    // Editor routes require a session
    let editor = Router::new()
        .route(
            "/api/projects",
            get(api::list_projects).post(api::create_project),
        )
        .route(
            "/api/projects/:id",
            get(api::get_project)
                .put(api::save_project)
                .patch(api::rename_project)
                .delete(api::delete_project),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    // Embeds are fetched from any site
    let embed = Router::new()
        .route("/api/embed/:id", get(api::embed_project))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET])
                .allow_headers(Any),
        );

    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .merge(editor)
        .merge(embed)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
