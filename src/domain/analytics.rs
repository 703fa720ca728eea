use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Analytics event types emitted by the chat pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    MessageSent,
    IntentDetected,
    LeadCreated,
    FallbackTriggered,
    QaImageMatched,
    McqPresent,
    FeedbackSubmitted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageSent => "message_sent",
            Self::IntentDetected => "intent_detected",
            Self::LeadCreated => "lead_created",
            Self::FallbackTriggered => "fallback_triggered",
            Self::QaImageMatched => "qa_image_matched",
            Self::McqPresent => "mcq_present",
            Self::FeedbackSubmitted => "feedback_submitted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub project_id: Uuid,
    pub event_type: String,
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate metrics for a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsSummary {
    pub event_counts: BTreeMap<String, i64>,
    pub responses_count: i64,
    pub avg_confidence: Option<f64>,
    pub feedback_count: i64,
    pub avg_rating: Option<f64>,
}
