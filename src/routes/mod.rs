pub mod analytics;
pub mod chat;
pub mod feedback;
pub mod health;
pub mod me;
pub mod projects;
pub mod qas;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        .route("/embed/:bot_key", get(chat::embed_project))
        .route("/embed/:bot_key/chat", post(chat::ask_by_key))
        .route("/projects/:project_id/chat", post(chat::ask))
        .route("/projects/:project_id/feedback", post(feedback::submit_feedback))
        // Protected routes
        .route("/me", get(me::get_me))
        .route("/projects", post(projects::create_project))
        .route("/projects/me", get(projects::my_project))
        .route(
            "/projects/:project_id",
            get(projects::get_project).patch(projects::update_project),
        )
        // QA corpus (nested under projects)
        .route(
            "/projects/:project_id/qas",
            get(qas::list_qas).post(qas::create_qa),
        )
        .route(
            "/projects/:project_id/qas/:qa_id",
            put(qas::update_qa).delete(qas::delete_qa),
        )
        .route("/projects/:project_id/leads", get(projects::list_leads))
        .route(
            "/projects/:project_id/debug/qa-match",
            get(projects::debug_qa_match),
        )
        // Analytics
        .route("/projects/:project_id/analytics", get(analytics::summary))
        .route(
            "/projects/:project_id/analytics/export",
            get(analytics::export),
        )
}
