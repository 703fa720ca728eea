//! In-process [`ChatStore`] used for local development and tests.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{ChatStore, StoreError, StoreResult};
use crate::domain::{
    AnalyticsEvent, AnalyticsSummary, BotResponse, ContextEntry, EventType, Feedback, Lead,
    NewBotResponse, NewFeedback, NewLead, NewProject, Project, QaRequest, QuestionAnswer,
    UpdateProjectRequest,
};

#[derive(Default)]
struct Tables {
    projects: Vec<Project>,
    qas: Vec<QuestionAnswer>,
    leads: Vec<Lead>,
    responses: Vec<BotResponse>,
    contexts: Vec<ContextEntry>,
    events: Vec<AnalyticsEvent>,
    feedback: Vec<Feedback>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Inspection helpers for tests
#[cfg(test)]
impl MemoryStore {
    pub fn leads(&self) -> Vec<Lead> {
        self.tables.lock().leads.clone()
    }

    pub fn responses(&self) -> Vec<BotResponse> {
        self.tables.lock().responses.clone()
    }

    pub fn contexts(&self) -> Vec<ContextEntry> {
        self.tables.lock().contexts.clone()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.tables.lock().events.clone()
    }

    pub fn feedback(&self) -> Vec<Feedback> {
        self.tables.lock().feedback.clone()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn health_check(&self) -> bool {
        true
    }

    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        let mut t = self.tables.lock();
        if t.projects.iter().any(|p| p.owner_id == new.owner_id) {
            return Err(StoreError::Conflict("Owner already has a project".to_string()));
        }
        if t.projects.iter().any(|p| p.bot_key == new.bot_key) {
            return Err(StoreError::Conflict("Bot key already in use".to_string()));
        }
        let project = Project {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            name: new.name,
            bot_key: new.bot_key,
            allowed_intents: new.allowed_intents,
            workflow_config: new.workflow_config,
            voice_enabled: new.voice_enabled,
            created_at: Utc::now(),
        };
        t.projects.push(project.clone());
        Ok(project)
    }

    async fn project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(self.tables.lock().projects.iter().find(|p| p.id == id).cloned())
    }

    async fn project_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<Project>> {
        let t = self.tables.lock();
        Ok(t.projects.iter().find(|p| p.owner_id == owner_id).cloned())
    }

    async fn project_by_bot_key(&self, bot_key: &str) -> StoreResult<Option<Project>> {
        let t = self.tables.lock();
        Ok(t.projects.iter().find(|p| p.bot_key == bot_key).cloned())
    }

    async fn update_project(
        &self,
        id: Uuid,
        update: UpdateProjectRequest,
    ) -> StoreResult<Project> {
        let mut t = self.tables.lock();
        let project = t
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound("Project".to_string()))?;

        if let Some(name) = update.name {
            project.name = name;
        }
        if let Some(intents) = update.allowed_intents {
            project.allowed_intents = intents;
        }
        if let Some(config) = update.workflow_config {
            project.workflow_config = config;
        }
        if let Some(voice) = update.voice_enabled {
            project.voice_enabled = voice;
        }
        Ok(project.clone())
    }

    async fn list_qas(&self, project_id: Uuid) -> StoreResult<Vec<QuestionAnswer>> {
        let t = self.tables.lock();
        Ok(t.qas
            .iter()
            .filter(|qa| qa.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_qa(&self, project_id: Uuid, qa: QaRequest) -> StoreResult<QuestionAnswer> {
        let entry = QuestionAnswer {
            id: Uuid::new_v4(),
            project_id,
            question: qa.question,
            answer: qa.answer,
            image: qa.image,
            image_description: qa.image_description,
            created_at: Utc::now(),
        };
        self.tables.lock().qas.push(entry.clone());
        Ok(entry)
    }

    async fn update_qa(
        &self,
        project_id: Uuid,
        qa_id: Uuid,
        qa: QaRequest,
    ) -> StoreResult<QuestionAnswer> {
        let mut t = self.tables.lock();
        let entry = t
            .qas
            .iter_mut()
            .find(|e| e.project_id == project_id && e.id == qa_id)
            .ok_or_else(|| StoreError::NotFound("Question".to_string()))?;
        entry.question = qa.question;
        entry.answer = qa.answer;
        entry.image = qa.image;
        entry.image_description = qa.image_description;
        Ok(entry.clone())
    }

    async fn delete_qa(&self, project_id: Uuid, qa_id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.lock();
        let before = t.qas.len();
        t.qas.retain(|e| !(e.project_id == project_id && e.id == qa_id));
        if t.qas.len() == before {
            return Err(StoreError::NotFound("Question".to_string()));
        }
        Ok(())
    }

    async fn create_lead(&self, lead: NewLead) -> StoreResult<Lead> {
        let lead = Lead {
            id: Uuid::new_v4(),
            project_id: lead.project_id,
            name: lead.name,
            email: lead.email,
            created_at: Utc::now(),
        };
        self.tables.lock().leads.push(lead.clone());
        Ok(lead)
    }

    async fn list_leads(
        &self,
        project_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> StoreResult<(Vec<Lead>, u64)> {
        let t = self.tables.lock();
        let mut leads: Vec<Lead> = t
            .leads
            .iter()
            .filter(|l| l.project_id == project_id)
            .cloned()
            .collect();
        let total = leads.len() as u64;
        // Newest first; reverse insertion order keeps ties stable
        leads.reverse();
        let page = leads
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn create_bot_response(&self, response: NewBotResponse) -> StoreResult<BotResponse> {
        let row = BotResponse {
            id: Uuid::new_v4(),
            project_id: response.project_id,
            question: response.question,
            response: response.response,
            confidence: response.confidence,
            payload: response.payload,
            created_at: Utc::now(),
        };
        self.tables.lock().responses.push(row.clone());
        Ok(row)
    }

    async fn bot_response(&self, project_id: Uuid, id: Uuid) -> StoreResult<Option<BotResponse>> {
        let t = self.tables.lock();
        Ok(t.responses
            .iter()
            .find(|r| r.project_id == project_id && r.id == id)
            .cloned())
    }

    async fn attach_qa_image(&self, response_id: Uuid, qa_image: Value) -> StoreResult<()> {
        let mut t = self.tables.lock();
        let row = t
            .responses
            .iter_mut()
            .find(|r| r.id == response_id)
            .ok_or_else(|| StoreError::NotFound("Bot response".to_string()))?;
        if !row.payload.is_object() {
            row.payload = Value::Object(Default::default());
        }
        if let Value::Object(map) = &mut row.payload {
            map.insert("qa_image".to_string(), qa_image);
        }
        Ok(())
    }

    async fn save_context(&self, entry: ContextEntry) -> StoreResult<()> {
        self.tables.lock().contexts.push(entry);
        Ok(())
    }

    async fn record_event(
        &self,
        project_id: Uuid,
        event_type: EventType,
        metadata: Value,
    ) -> StoreResult<()> {
        self.tables.lock().events.push(AnalyticsEvent {
            id: Uuid::new_v4(),
            project_id,
            event_type: event_type.as_str().to_string(),
            metadata,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn create_feedback(&self, feedback: NewFeedback) -> StoreResult<Feedback> {
        let row = Feedback {
            id: Uuid::new_v4(),
            project_id: feedback.project_id,
            question: feedback.question,
            response: feedback.response,
            rating: feedback.rating,
            comment: feedback.comment,
            selected_option: feedback.selected_option,
            bot_response_id: feedback.bot_response_id,
            created_at: Utc::now(),
        };
        self.tables.lock().feedback.push(row.clone());
        Ok(row)
    }

    async fn analytics_summary(&self, project_id: Uuid) -> StoreResult<AnalyticsSummary> {
        let t = self.tables.lock();

        let mut event_counts = BTreeMap::new();
        for e in t.events.iter().filter(|e| e.project_id == project_id) {
            *event_counts.entry(e.event_type.clone()).or_insert(0i64) += 1;
        }

        let responses: Vec<&BotResponse> = t
            .responses
            .iter()
            .filter(|r| r.project_id == project_id)
            .collect();
        let feedback: Vec<&Feedback> = t
            .feedback
            .iter()
            .filter(|f| f.project_id == project_id)
            .collect();

        Ok(AnalyticsSummary {
            event_counts,
            responses_count: responses.len() as i64,
            avg_confidence: mean(responses.iter().filter_map(|r| r.confidence)),
            feedback_count: feedback.len() as i64,
            avg_rating: mean(feedback.iter().filter_map(|f| f.rating.map(f64::from))),
        })
    }
}
