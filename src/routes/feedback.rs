//! Visitor feedback on chatbot replies

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::app::AppState;
use crate::domain::{FeedbackAck, FeedbackRequest};
use crate::error::{ApiError, ApiResult};

/// POST /projects/:project_id/feedback
pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<FeedbackRequest>,
) -> ApiResult<Json<FeedbackAck>> {
    let project = state
        .store
        .project(project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))?;

    Ok(Json(state.chat.submit_feedback(&project, req).await))
}

#[cfg(test)]
mod tests {
    use crate::app::tests::test_app;
    use crate::domain::{generate_bot_key, NewProject, Project};
    use crate::services::store::{ChatStore, MemoryStore};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn project(store: &MemoryStore) -> Project {
        store
            .create_project(NewProject {
                owner_id: Uuid::new_v4(),
                name: "Cafe".into(),
                bot_key: generate_bot_key(),
                allowed_intents: vec![],
                workflow_config: json!({}),
                voice_enabled: false,
            })
            .await
            .unwrap()
    }

    async fn post_feedback(app: &Router, project_id: Uuid, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(format!("/projects/{project_id}/feedback"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn feedback_is_acknowledged_and_stored() {
        let (app, store, _settings) = test_app("http://127.0.0.1:9");
        let project = project(&store).await;

        let (status, body) = post_feedback(
            &app,
            project.id,
            json!({"rating": 4, "comment": "Helpful", "selected_option": "Tue"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));

        let stored = store.feedback();
        assert_eq!(stored.len(), 1);
        assert_eq!(body["feedback_id"], json!(stored[0].id));
        assert_eq!(stored[0].rating, Some(4));
        assert_eq!(stored[0].selected_option.as_deref(), Some("Tue"));
    }

    #[tokio::test]
    async fn string_and_fractional_ratings_are_acknowledged() {
        let (app, store, _settings) = test_app("http://127.0.0.1:9");
        let project = project(&store).await;

        let (status, body) = post_feedback(&app, project.id, json!({"rating": "5"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));

        let (status, body) = post_feedback(&app, project.id, json!({"rating": 4.5})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));

        let ratings: Vec<_> = store.feedback().iter().map(|f| f.rating).collect();
        assert_eq!(ratings, vec![Some(5), Some(5)]);
    }

    #[tokio::test]
    async fn malformed_response_id_is_stored_unlinked() {
        let (app, store, _settings) = test_app("http://127.0.0.1:9");
        let project = project(&store).await;

        let (status, body) =
            post_feedback(&app, project.id, json!({"bot_response_id": "12", "rating": 2})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));

        let stored = store.feedback();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].bot_response_id, None);
        assert_eq!(stored[0].rating, Some(2));
    }
}
