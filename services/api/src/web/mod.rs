pub mod auth;
pub mod lesson_plan_task;
pub mod middleware;
pub mod notes_task;
pub mod qa_task;
pub mod rest;
pub mod state;
pub mod token;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use middleware::require_auth;
use auth::{login_handler, logout_handler};
use rest::{
    ask_question_handler, export_lesson_plan_handler, export_notes_handler,
    generate_lesson_plan_handler, generate_notes_handler, health_handler,
    save_lesson_plan_handler, save_notes_handler, session_handler,
};
use state::AppState;

/// Builds the API router. CORS and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    let max_upload_bytes = app_state.config.max_upload_bytes;

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/login", post(login_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(logout_handler))
        .route("/session", get(session_handler))
        .route(
            "/lesson-plan",
            post(generate_lesson_plan_handler).put(save_lesson_plan_handler),
        )
        .route("/lesson-plan/export", get(export_lesson_plan_handler))
        .route(
            "/notes",
            post(generate_notes_handler).put(save_notes_handler),
        )
        .route("/notes/export", get(export_notes_handler))
        .route("/qa", post(ask_question_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
