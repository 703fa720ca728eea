//! Public chatbot routes used by the embeddable widget

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::app::AppState;
use crate::domain::{AskRequest, AskResponse, EmbedProjectResponse, Project};
use crate::error::{ApiError, ApiResult};

async fn project_by_key(state: &AppState, bot_key: &str) -> ApiResult<Project> {
    state
        .store
        .project_by_bot_key(bot_key)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))
}

/// GET /embed/:bot_key
pub async fn embed_project(
    State(state): State<Arc<AppState>>,
    Path(bot_key): Path<String>,
) -> ApiResult<Json<EmbedProjectResponse>> {
    let project = project_by_key(&state, &bot_key).await?;
    Ok(Json(project.into()))
}

/// POST /projects/:project_id/chat
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> ApiResult<Json<AskResponse>> {
    let project = state
        .store
        .project(project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))?;

    state.chat.ask(&project, req).await.map(Json)
}

/// POST /embed/:bot_key/chat
pub async fn ask_by_key(
    State(state): State<Arc<AppState>>,
    Path(bot_key): Path<String>,
    Json(req): Json<AskRequest>,
) -> ApiResult<Json<AskResponse>> {
    let project = project_by_key(&state, &bot_key).await?;
    state.chat.ask(&project, req).await.map(Json)
}
