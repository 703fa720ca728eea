//! PostgreSQL implementation of [`ChatStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ChatStore, StoreError, StoreResult};
use crate::domain::{
    AnalyticsSummary, BotResponse, ContextEntry, EventType, Feedback, Intent, Lead,
    NewBotResponse, NewFeedback, NewLead, NewProject, Project, QaRequest, QuestionAnswer,
    UpdateProjectRequest,
};

const PROJECT_COLUMNS: &str =
    "id, owner_id, name, bot_key, allowed_intents, workflow_config, voice_enabled, created_at";
const QA_COLUMNS: &str = "id, project_id, question, answer, image, image_description, created_at";
const RESPONSE_COLUMNS: &str = "id, project_id, question, response, confidence, payload, created_at";

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    bot_key: String,
    allowed_intents: Vec<String>,
    workflow_config: Value,
    voice_enabled: bool,
    created_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        // Unknown names are dropped rather than widening the allow-list
        let allowed_intents = row
            .allowed_intents
            .iter()
            .filter_map(|s| Intent::parse(s))
            .collect();

        Self {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            bot_key: row.bot_key,
            allowed_intents,
            workflow_config: row.workflow_config,
            voice_enabled: row.voice_enabled,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QaRow {
    id: Uuid,
    project_id: Uuid,
    question: String,
    answer: String,
    image: Option<String>,
    image_description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<QaRow> for QuestionAnswer {
    fn from(row: QaRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            question: row.question,
            answer: row.answer,
            image: row.image,
            image_description: row.image_description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LeadRow {
    id: Uuid,
    project_id: Uuid,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl From<LeadRow> for Lead {
    fn from(row: LeadRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BotResponseRow {
    id: Uuid,
    project_id: Uuid,
    question: String,
    response: String,
    confidence: Option<f64>,
    payload: Value,
    created_at: DateTime<Utc>,
}

impl From<BotResponseRow> for BotResponse {
    fn from(row: BotResponseRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            question: row.question,
            response: row.response,
            confidence: row.confidence,
            payload: row.payload,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FeedbackRow {
    id: Uuid,
    project_id: Uuid,
    question: String,
    response: String,
    rating: Option<i32>,
    comment: String,
    selected_option: Option<String>,
    bot_response_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<FeedbackRow> for Feedback {
    fn from(row: FeedbackRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            question: row.question,
            response: row.response,
            rating: row.rating,
            comment: row.comment,
            selected_option: row.selected_option,
            bot_response_id: row.bot_response_id,
            created_at: row.created_at,
        }
    }
}

fn intent_names(intents: &[Intent]) -> Vec<String> {
    intents.iter().map(|i| i.as_str().to_string()).collect()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn project_query(filter: &str) -> String {
        format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE {filter}")
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        let sql = format!(
            r#"
            INSERT INTO projects (id, owner_id, name, bot_key, allowed_intents, workflow_config, voice_enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PROJECT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.owner_id)
            .bind(&new.name)
            .bind(&new.bot_key)
            .bind(intent_names(&new.allowed_intents))
            .bind(&new.workflow_config)
            .bind(new.voice_enabled)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict("Owner already has a project".to_string())
                } else {
                    e.into()
                }
            })?;
        Ok(row.into())
    }

    async fn project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(&Self::project_query("id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn project_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(&Self::project_query("owner_id = $1"))
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn project_by_bot_key(&self, bot_key: &str) -> StoreResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(&Self::project_query("bot_key = $1"))
            .bind(bot_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn update_project(
        &self,
        id: Uuid,
        update: UpdateProjectRequest,
    ) -> StoreResult<Project> {
        let sql = format!(
            r#"
            UPDATE projects SET
                name = COALESCE($2, name),
                allowed_intents = COALESCE($3, allowed_intents),
                workflow_config = COALESCE($4, workflow_config),
                voice_enabled = COALESCE($5, voice_enabled)
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(id)
            .bind(update.name)
            .bind(update.allowed_intents.as_deref().map(intent_names))
            .bind(update.workflow_config)
            .bind(update.voice_enabled)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("Project".to_string()))?;
        Ok(row.into())
    }

    async fn list_qas(&self, project_id: Uuid) -> StoreResult<Vec<QuestionAnswer>> {
        let sql = format!(
            "SELECT {QA_COLUMNS} FROM question_answers WHERE project_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, QaRow>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_qa(&self, project_id: Uuid, qa: QaRequest) -> StoreResult<QuestionAnswer> {
        let sql = format!(
            r#"
            INSERT INTO question_answers (id, project_id, question, answer, image, image_description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {QA_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, QaRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(&qa.question)
            .bind(&qa.answer)
            .bind(&qa.image)
            .bind(&qa.image_description)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn update_qa(
        &self,
        project_id: Uuid,
        qa_id: Uuid,
        qa: QaRequest,
    ) -> StoreResult<QuestionAnswer> {
        let sql = format!(
            r#"
            UPDATE question_answers
            SET question = $3, answer = $4, image = $5, image_description = $6
            WHERE project_id = $1 AND id = $2
            RETURNING {QA_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, QaRow>(&sql)
            .bind(project_id)
            .bind(qa_id)
            .bind(&qa.question)
            .bind(&qa.answer)
            .bind(&qa.image)
            .bind(&qa.image_description)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("Question".to_string()))?;
        Ok(row.into())
    }

    async fn delete_qa(&self, project_id: Uuid, qa_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM question_answers WHERE project_id = $1 AND id = $2")
            .bind(project_id)
            .bind(qa_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Question".to_string()));
        }
        Ok(())
    }

    async fn create_lead(&self, lead: NewLead) -> StoreResult<Lead> {
        let row = sqlx::query_as::<_, LeadRow>(
            r#"
            INSERT INTO leads (id, project_id, name, email)
            VALUES ($1, $2, $3, $4)
            RETURNING id, project_id, name, email, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(lead.project_id)
        .bind(&lead.name)
        .bind(&lead.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_leads(
        &self,
        project_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> StoreResult<(Vec<Lead>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, LeadRow>(
            r#"
            SELECT id, project_id, name, email, created_at
            FROM leads
            WHERE project_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(project_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total.max(0) as u64))
    }

    async fn create_bot_response(&self, response: NewBotResponse) -> StoreResult<BotResponse> {
        let sql = format!(
            r#"
            INSERT INTO bot_responses (id, project_id, question, response, confidence, payload)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RESPONSE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, BotResponseRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(response.project_id)
            .bind(&response.question)
            .bind(&response.response)
            .bind(response.confidence)
            .bind(&response.payload)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn bot_response(&self, project_id: Uuid, id: Uuid) -> StoreResult<Option<BotResponse>> {
        let sql =
            format!("SELECT {RESPONSE_COLUMNS} FROM bot_responses WHERE project_id = $1 AND id = $2");
        let row = sqlx::query_as::<_, BotResponseRow>(&sql)
            .bind(project_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn attach_qa_image(&self, response_id: Uuid, qa_image: Value) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE bot_responses SET payload = jsonb_set(payload, '{qa_image}', $2, true) WHERE id = $1",
        )
        .bind(response_id)
        .bind(&qa_image)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Bot response".to_string()));
        }
        Ok(())
    }

    async fn save_context(&self, entry: ContextEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO conversation_contexts (id, project_id, session_key, key, value)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.project_id)
        .bind(&entry.session_key)
        .bind(&entry.key)
        .bind(&entry.value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_event(
        &self,
        project_id: Uuid,
        event_type: EventType,
        metadata: Value,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO analytics_events (id, project_id, event_type, metadata) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(event_type.as_str())
        .bind(&metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_feedback(&self, feedback: NewFeedback) -> StoreResult<Feedback> {
        let row = sqlx::query_as::<_, FeedbackRow>(
            r#"
            INSERT INTO feedbacks (id, project_id, question, response, rating, comment, selected_option, bot_response_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, project_id, question, response, rating, comment, selected_option, bot_response_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(feedback.project_id)
        .bind(&feedback.question)
        .bind(&feedback.response)
        .bind(feedback.rating)
        .bind(&feedback.comment)
        .bind(&feedback.selected_option)
        .bind(feedback.bot_response_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn analytics_summary(&self, project_id: Uuid) -> StoreResult<AnalyticsSummary> {
        let counts: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT event_type, COUNT(*)
            FROM analytics_events
            WHERE project_id = $1
            GROUP BY event_type
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        let (responses_count, avg_confidence): (i64, Option<f64>) = sqlx::query_as(
            "SELECT COUNT(*), AVG(confidence) FROM bot_responses WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;

        let (feedback_count, avg_rating): (i64, Option<f64>) = sqlx::query_as(
            "SELECT COUNT(*), AVG(rating)::float8 FROM feedbacks WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(AnalyticsSummary {
            event_counts: counts.into_iter().collect(),
            responses_count,
            avg_confidence,
            feedback_count,
            avg_rating,
        })
    }
}
