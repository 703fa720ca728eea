//! Owner analytics: summary metrics and CSV export

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::projects::owned_project;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::AnalyticsSummary;
use crate::error::ApiResult;
use crate::services::analytics::export_csv;

/// GET /projects/:project_id/analytics
pub async fn summary(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<AnalyticsSummary>> {
    owned_project(&state, &auth, project_id).await?;
    let summary = state.store.analytics_summary(project_id).await?;
    Ok(Json(summary))
}

/// GET /projects/:project_id/analytics/export
pub async fn export(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    owned_project(&state, &auth, project_id).await?;
    let summary = state.store.analytics_summary(project_id).await?;
    let csv = export_csv(&summary)?;

    tracing::info!(user_id = %auth.user_id, project_id = %project_id, "Exporting analytics");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"project_{project_id}_analytics.csv\""),
            ),
        ],
        csv,
    ))
}

#[cfg(test)]
mod tests {
    use crate::app::tests::test_app;
    use crate::auth::verifier::tests::token_for;
    use crate::domain::{generate_bot_key, EventType, NewProject};
    use crate::services::store::ChatStore;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn summary_and_csv_export() {
        let (app, store, settings) = test_app("http://127.0.0.1:9");
        let owner = Uuid::new_v4();
        let token = token_for(&settings, owner);
        let project = store
            .create_project(NewProject {
                owner_id: owner,
                name: "Cafe".into(),
                bot_key: generate_bot_key(),
                allowed_intents: vec![],
                workflow_config: json!({}),
                voice_enabled: false,
            })
            .await
            .unwrap();
        store
            .record_event(project.id, EventType::MessageSent, json!({}))
            .await
            .unwrap();

        let get = |uri: String| {
            Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };

        let resp = app
            .clone()
            .oneshot(get(format!("/projects/{}/analytics", project.id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["event_counts"], json!({"message_sent": 1}));
        assert_eq!(body["avg_confidence"], Value::Null);

        let resp = app
            .oneshot(get(format!("/projects/{}/analytics/export", project.id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/csv");
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("metric,value\r\n"));
        assert!(text.ends_with("event_type,count\r\nmessage_sent,1\r\n"));
    }
}
