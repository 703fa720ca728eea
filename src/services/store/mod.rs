//! Persistence seam for projects, their corpus and chat side effects.
//!
//! [`PgStore`] is the production backend. [`MemoryStore`] keeps everything
//! in process and is used in dev without a database and in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    AnalyticsSummary, BotResponse, ContextEntry, EventType, Feedback, Lead, NewBotResponse,
    NewFeedback, NewLead, NewProject, Project, QaRequest, QuestionAnswer, UpdateProjectRequest,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn health_check(&self) -> bool;

    // Projects
    async fn create_project(&self, new: NewProject) -> StoreResult<Project>;
    async fn project(&self, id: Uuid) -> StoreResult<Option<Project>>;
    async fn project_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<Project>>;
    async fn project_by_bot_key(&self, bot_key: &str) -> StoreResult<Option<Project>>;
    async fn update_project(&self, id: Uuid, update: UpdateProjectRequest)
        -> StoreResult<Project>;

    // Corpus, in creation order
    async fn list_qas(&self, project_id: Uuid) -> StoreResult<Vec<QuestionAnswer>>;
    async fn create_qa(&self, project_id: Uuid, qa: QaRequest) -> StoreResult<QuestionAnswer>;
    async fn update_qa(
        &self,
        project_id: Uuid,
        qa_id: Uuid,
        qa: QaRequest,
    ) -> StoreResult<QuestionAnswer>;
    async fn delete_qa(&self, project_id: Uuid, qa_id: Uuid) -> StoreResult<()>;

    // Chat turn side effects
    async fn create_lead(&self, lead: NewLead) -> StoreResult<Lead>;
    async fn list_leads(
        &self,
        project_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> StoreResult<(Vec<Lead>, u64)>;
    async fn create_bot_response(&self, response: NewBotResponse) -> StoreResult<BotResponse>;
    async fn bot_response(&self, project_id: Uuid, id: Uuid) -> StoreResult<Option<BotResponse>>;
    /// Set `payload.qa_image` on an existing response.
    async fn attach_qa_image(&self, response_id: Uuid, qa_image: Value) -> StoreResult<()>;
    async fn save_context(&self, entry: ContextEntry) -> StoreResult<()>;
    async fn record_event(
        &self,
        project_id: Uuid,
        event_type: EventType,
        metadata: Value,
    ) -> StoreResult<()>;
    async fn create_feedback(&self, feedback: NewFeedback) -> StoreResult<Feedback>;

    // Analytics
    async fn analytics_summary(&self, project_id: Uuid) -> StoreResult<AnalyticsSummary>;
}
