//! Project routes
//!
//! Owner-facing project management. Each owner has at most one project.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{
    generate_bot_key, CreateProjectRequest, NewProject, Project, QuestionAnswer,
    UpdateProjectRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::services::image_matcher::ImageMatcher;
use crate::services::workflow::validate_workflow;

const NAME_MAX_LEN: usize = 255;

/// Load a project owned by the caller. Foreign projects read as missing.
pub(crate) async fn owned_project(
    state: &AppState,
    auth: &RequireAuth,
    project_id: Uuid,
) -> ApiResult<Project> {
    match state.store.project(project_id).await? {
        Some(project) if project.owner_id == auth.user_id => Ok(project),
        _ => Err(ApiError::not_found("Project")),
    }
}

fn validate_name(name: &str, errors: &mut Vec<String>) {
    if name.trim().is_empty() {
        errors.push("name must not be empty".to_string());
    } else if name.trim().chars().count() > NAME_MAX_LEN {
        errors.push(format!("name must be at most {} characters", NAME_MAX_LEN));
    }
}

/// POST /projects
pub async fn create_project(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    tracing::info!(user_id = %auth.user_id, project_name = %req.name, "Creating project");

    let mut errors = Vec::new();
    validate_name(&req.name, &mut errors);
    let workflow_config = req.workflow_config.unwrap_or_else(|| serde_json::json!({}));
    errors.extend(validate_workflow(&workflow_config));
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if state.store.project_by_owner(auth.user_id).await?.is_some() {
        return Err(ApiError::Conflict("Owner already has a project".to_string()));
    }

    let project = state
        .store
        .create_project(NewProject {
            owner_id: auth.user_id,
            name: req.name.trim().to_string(),
            bot_key: generate_bot_key(),
            allowed_intents: req.allowed_intents,
            workflow_config,
            voice_enabled: req.voice_enabled,
        })
        .await?;

    tracing::info!(project_id = %project.id, "Project created");
    Ok(Created(project))
}

/// GET /projects/me
pub async fn my_project(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Project>> {
    state
        .store
        .project_by_owner(auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Project"))
}

/// GET /projects/:project_id
pub async fn get_project(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    owned_project(&state, &auth, project_id).await.map(Json)
}

/// PATCH /projects/:project_id
pub async fn update_project(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(mut req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    owned_project(&state, &auth, project_id).await?;

    let mut errors = Vec::new();
    if let Some(name) = &req.name {
        validate_name(name, &mut errors);
    }
    if let Some(config) = &req.workflow_config {
        errors.extend(validate_workflow(config));
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    req.name = req.name.map(|n| n.trim().to_string());

    tracing::info!(user_id = %auth.user_id, project_id = %project_id, "Updating project");
    let project = state.store.update_project(project_id, req).await?;
    Ok(Json(project))
}

/// GET /projects/:project_id/leads
pub async fn list_leads(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<impl IntoResponse> {
    owned_project(&state, &auth, project_id).await?;

    let (leads, total) = state
        .store
        .list_leads(project_id, pagination.limit(), pagination.offset())
        .await?;
    Ok(Paginated::new(leads, &pagination, total))
}

#[derive(Debug, Deserialize)]
pub struct DebugMatchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Serialize)]
pub struct DebugCandidate {
    pub id: Uuid,
    pub question: String,
    pub has_image: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DebugMatchResponse {
    pub provided_q: String,
    pub provided_msg: String,
    pub threshold: f64,
    pub chosen: Option<DebugCandidate>,
    pub chosen_score: Option<f64>,
    pub second: Option<DebugCandidate>,
    pub second_score: Option<f64>,
}

/// GET /projects/:project_id/debug/qa-match?q=&msg=
///
/// Shows which QA entry the image matcher would pick and the runner-up.
pub async fn debug_qa_match(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<DebugMatchQuery>,
) -> ApiResult<Json<DebugMatchResponse>> {
    owned_project(&state, &auth, project_id).await?;

    let q = query.q.trim();
    let msg = query.msg.trim();
    if q.is_empty() && msg.is_empty() {
        return Err(ApiError::bad_request("Provide q or msg as query parameter"));
    }

    let qas = state.store.list_qas(project_id).await?;
    let matcher = state.chat.matcher();
    let ranking = matcher.rank(&qas, q, msg);

    let chosen = ImageMatcher::direct_match(&qas, q)
        .map(|m| (m.qa, m.score))
        .or(ranking.best);

    let candidate = |qa: &QuestionAnswer, with_image: bool| DebugCandidate {
        id: qa.id,
        question: qa.question.clone(),
        has_image: qa.has_image(),
        image_url: with_image
            .then(|| qa.image.as_deref().map(|i| state.chat.media().resolve(i)))
            .flatten(),
        image_description: with_image.then(|| qa.caption()),
    };

    Ok(Json(DebugMatchResponse {
        provided_q: q.to_string(),
        provided_msg: msg.to_string(),
        threshold: matcher.threshold(),
        chosen: chosen.map(|(qa, _)| candidate(qa, qa.has_image())),
        chosen_score: chosen.map(|(_, s)| s),
        second: ranking.second.map(|(qa, _)| candidate(qa, false)),
        second_score: ranking.second.map(|(_, s)| s),
    }))
}

#[cfg(test)]
mod tests {
    use crate::app::tests::test_app;
    use crate::auth::verifier::tests::token_for;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn authed(method: Method, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json");
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        builder.body(body).unwrap()
    }

    #[tokio::test]
    async fn create_then_fetch_own_project() {
        let (app, _store, settings) = test_app("http://127.0.0.1:9");
        let token = token_for(&settings, Uuid::new_v4());

        let (status, created) = send(
            &app,
            authed(
                Method::POST,
                "/projects",
                &token,
                Some(json!({"name": "Cafe", "allowed_intents": ["answer", "lead"]})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["bot_key"].as_str().unwrap().len(), 32);
        assert_eq!(created["allowed_intents"], json!(["answer", "lead"]));

        let (status, _) = send(
            &app,
            authed(Method::POST, "/projects", &token, Some(json!({"name": "Again"}))),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, mine) = send(&app, authed(Method::GET, "/projects/me", &token, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine["id"], created["id"]);
    }

    #[tokio::test]
    async fn requires_bearer_token() {
        let (app, _store, _settings) = test_app("http://127.0.0.1:9");
        let req = Request::builder()
            .uri("/projects/me")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], json!("UNAUTHORIZED"));
    }

    #[tokio::test]
    async fn foreign_project_reads_as_missing() {
        let (app, _store, settings) = test_app("http://127.0.0.1:9");
        let owner = token_for(&settings, Uuid::new_v4());
        let stranger = token_for(&settings, Uuid::new_v4());

        let (_, created) = send(
            &app,
            authed(Method::POST, "/projects", &owner, Some(json!({"name": "Cafe"}))),
        )
        .await;
        let uri = format!("/projects/{}", created["id"].as_str().unwrap());

        let (status, _) = send(&app, authed(Method::GET, &uri, &stranger, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_rejects_invalid_workflow() {
        let (app, _store, settings) = test_app("http://127.0.0.1:9");
        let token = token_for(&settings, Uuid::new_v4());
        let (_, created) = send(
            &app,
            authed(Method::POST, "/projects", &token, Some(json!({"name": "Cafe"}))),
        )
        .await;
        let uri = format!("/projects/{}", created["id"].as_str().unwrap());

        let (status, body) = send(
            &app,
            authed(
                Method::PATCH,
                &uri,
                &token,
                Some(json!({"workflow_config": {"nodes": []}})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));
        assert_eq!(body["details"][0], json!("'nodes' must be a non-empty array."));

        let (status, body) = send(
            &app,
            authed(
                Method::PATCH,
                &uri,
                &token,
                Some(json!({"voice_enabled": true, "allowed_intents": ["greeting"]})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["voice_enabled"], json!(true));
        assert_eq!(body["allowed_intents"], json!(["greeting"]));
        assert_eq!(body["name"], json!("Cafe"));
    }

    #[tokio::test]
    async fn debug_match_reports_ranking() {
        let (app, _store, settings) = test_app("http://127.0.0.1:9");
        let token = token_for(&settings, Uuid::new_v4());
        let (_, created) = send(
            &app,
            authed(Method::POST, "/projects", &token, Some(json!({"name": "Cafe"}))),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        for (q, image) in [
            ("What are your opening hours?", Some("answers/hours.png")),
            ("Where can I park?", None),
        ] {
            let (status, _) = send(
                &app,
                authed(
                    Method::POST,
                    &format!("/projects/{id}/qas"),
                    &token,
                    Some(json!({"question": q, "answer": "x", "image": image})),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = send(
            &app,
            authed(
                Method::GET,
                &format!("/projects/{id}/debug/qa-match?q=opening%20hours"),
                &token,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chosen"]["question"], json!("What are your opening hours?"));
        assert_eq!(body["chosen_score"], json!(1.0));
        assert_eq!(
            body["chosen"]["image_url"],
            json!("http://bot.test/media/answers/hours.png")
        );

        let (status, _) = send(
            &app,
            authed(Method::GET, &format!("/projects/{id}/debug/qa-match"), &token, None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
