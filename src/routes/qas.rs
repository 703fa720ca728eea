//! QA corpus routes
//!
//! The question/answer entries a project's chatbot answers from.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::projects::owned_project;
use crate::api::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{QaRequest, QuestionAnswer};
use crate::error::{ApiError, ApiResult};

/// GET /projects/:project_id/qas
pub async fn list_qas(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<DataResponse<Vec<QuestionAnswer>>> {
    owned_project(&state, &auth, project_id).await?;
    let qas = state.store.list_qas(project_id).await?;
    Ok(DataResponse::new(qas))
}

/// POST /projects/:project_id/qas
pub async fn create_qa(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<QaRequest>,
) -> ApiResult<impl IntoResponse> {
    owned_project(&state, &auth, project_id).await?;
    let req = req.validated().map_err(ApiError::Validation)?;

    let qa = state.store.create_qa(project_id, req).await?;
    tracing::info!(project_id = %project_id, qa_id = %qa.id, "QA entry created");
    Ok(Created(qa))
}

/// PUT /projects/:project_id/qas/:qa_id
pub async fn update_qa(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((project_id, qa_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<QaRequest>,
) -> ApiResult<Json<QuestionAnswer>> {
    owned_project(&state, &auth, project_id).await?;
    let req = req.validated().map_err(ApiError::Validation)?;

    let qa = state.store.update_qa(project_id, qa_id, req).await?;
    Ok(Json(qa))
}

/// DELETE /projects/:project_id/qas/:qa_id
pub async fn delete_qa(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((project_id, qa_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<NoContent> {
    owned_project(&state, &auth, project_id).await?;
    state.store.delete_qa(project_id, qa_id).await?;
    tracing::info!(project_id = %project_id, qa_id = %qa_id, "QA entry deleted");
    Ok(NoContent)
}
