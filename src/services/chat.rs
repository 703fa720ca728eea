//! One chatbot turn end to end: routing, intent side effects, persistence,
//! analytics and image attachment.
//!
//! Persistence here is best-effort. A failed write is logged at WARN and the
//! reply is still returned.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{
    AskRequest, AskResponse, ChatTurn, ContextEntry, EventType, FeedbackAck, FeedbackRequest,
    ImageRef, Intent, Language, NewBotResponse, NewFeedback, NewLead, Project, QuestionAnswer,
};
use crate::error::{ApiError, ApiResult};
use crate::services::image_matcher::{ImageMatcher, QaMatch};
use crate::services::intent_router::{IntentRouter, FALLBACK_MESSAGE};
use crate::services::language::detect_language;
use crate::services::media::MediaUrls;
use crate::services::store::ChatStore;

const LEAD_NAME_MAX_CHARS: usize = 255;

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    router: IntentRouter,
    matcher: ImageMatcher,
    media: MediaUrls,
}

fn non_empty_str<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// `data.confidence` as a number or a numeric string.
pub fn extract_confidence(data: &Map<String, Value>) -> Option<f64> {
    match data.get("confidence")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl ChatService {
    pub fn new(
        store: Arc<dyn ChatStore>,
        router: IntentRouter,
        matcher: ImageMatcher,
        media: MediaUrls,
    ) -> Self {
        Self {
            store,
            router,
            matcher,
            media,
        }
    }

    pub fn matcher(&self) -> &ImageMatcher {
        &self.matcher
    }

    pub fn media(&self) -> &MediaUrls {
        &self.media
    }

    async fn track(&self, project_id: Uuid, event: EventType, metadata: Value) {
        if let Err(e) = self.store.record_event(project_id, event, metadata).await {
            warn!(
                project_id = %project_id,
                event = event.as_str(),
                error = %e,
                "Failed to record analytics event"
            );
        }
    }

    #[instrument(skip(self, project, req), fields(project_id = %project.id))]
    pub async fn ask(&self, project: &Project, req: AskRequest) -> ApiResult<AskResponse> {
        let question = req.question.trim();
        if question.is_empty() {
            return Err(ApiError::bad_request("question is required"));
        }

        let default_language = Language::from_code(req.language.as_deref());
        let language = detect_language(question, default_language);
        self.track(
            project.id,
            EventType::MessageSent,
            json!({"question": question, "language": language.code()}),
        )
        .await;

        let qas = match self.store.list_qas(project.id).await {
            Ok(qas) => qas,
            Err(e) => {
                warn!(project_id = %project.id, error = %e, "Failed to load QA corpus");
                Vec::new()
            }
        };

        let mut turn = self.router.route(&qas, question, language).await;
        debug!(
            project_id = %project.id,
            intent = %turn.intent,
            language = turn.language.code(),
            "Turn routed"
        );

        if !project.allows(turn.intent) {
            info!(project_id = %project.id, intent = %turn.intent, "Intent not enabled, downgrading");
            turn.intent = Intent::Unknown;
        }
        self.track(
            project.id,
            EventType::IntentDetected,
            json!({"intent": turn.intent.as_str()}),
        )
        .await;

        self.handle_intent(project, &mut turn).await;

        let confidence = extract_confidence(&turn.data);
        let bot_response_id = self.persist_response(project, &turn, confidence).await;
        self.save_memory(project, &turn, req.session_id.as_deref()).await;

        let mcq = turn.data.get("mcq").cloned();
        let clarify = turn.data.get("clarify").cloned();
        if let Some(Value::Array(options)) = &mcq {
            if !options.is_empty() {
                self.track(project.id, EventType::McqPresent, json!({"mcq_count": options.len()}))
                    .await;
            }
        }

        let image = self.attach_image(project, &qas, &turn, bot_response_id).await;

        Ok(AskResponse {
            answer: turn.message,
            intent: turn.intent,
            data: turn.data,
            language,
            bot_response_id,
            image,
            mcq,
            clarify,
            confidence,
        })
    }

    async fn handle_intent(&self, project: &Project, turn: &mut ChatTurn) {
        match turn.intent {
            Intent::Lead => {
                let saved = self.save_lead(project, &turn.data).await;
                turn.data.insert("lead_saved".into(), Value::Bool(saved));
            }
            Intent::Booking => {
                turn.data
                    .entry("booking_handled")
                    .or_insert(Value::Bool(false));
            }
            Intent::Unknown => {
                if turn.message.trim().is_empty() {
                    turn.message = FALLBACK_MESSAGE.to_string();
                }
                self.track(
                    project.id,
                    EventType::FallbackTriggered,
                    json!({"reason": "unknown_intent"}),
                )
                .await;
            }
            Intent::Answer | Intent::Greeting => {}
        }
    }

    async fn save_lead(&self, project: &Project, data: &Map<String, Value>) -> bool {
        let name: String = non_empty_str(data, "name")
            .or_else(|| non_empty_str(data, "full_name"))
            .unwrap_or_default()
            .chars()
            .take(LEAD_NAME_MAX_CHARS)
            .collect();
        let email = non_empty_str(data, "email").unwrap_or_default().to_string();

        let lead = NewLead {
            project_id: project.id,
            name,
            email,
        };
        match self.store.create_lead(lead).await {
            Ok(lead) => {
                info!(project_id = %project.id, lead_id = %lead.id, "Lead saved");
                self.track(
                    project.id,
                    EventType::LeadCreated,
                    json!({"lead_id": lead.id, "name": lead.name, "email": lead.email}),
                )
                .await;
                true
            }
            Err(e) => {
                warn!(project_id = %project.id, error = %e, "Failed to save lead");
                false
            }
        }
    }

    async fn persist_response(
        &self,
        project: &Project,
        turn: &ChatTurn,
        confidence: Option<f64>,
    ) -> Option<Uuid> {
        let payload = serde_json::to_value(turn.payload()).unwrap_or_else(|_| json!({}));
        let row = NewBotResponse {
            project_id: project.id,
            question: turn.question.clone(),
            response: turn.message.clone(),
            confidence,
            payload,
        };
        match self.store.create_bot_response(row).await {
            Ok(saved) => Some(saved.id),
            Err(e) => {
                warn!(project_id = %project.id, error = %e, "Failed to save bot response");
                None
            }
        }
    }

    async fn save_memory(&self, project: &Project, turn: &ChatTurn, session_id: Option<&str>) {
        let memory = turn
            .data
            .get("context_memory")
            .filter(|v| v.is_object())
            .or_else(|| turn.data.get("memory"))
            .and_then(Value::as_object);
        let Some(memory) = memory else {
            return;
        };

        for (key, value) in memory {
            let entry = ContextEntry {
                project_id: project.id,
                session_key: session_id.map(str::to_string),
                key: key.clone(),
                value: value.clone(),
            };
            if let Err(e) = self.store.save_context(entry).await {
                warn!(project_id = %project.id, key = %key, error = %e, "Failed to save context");
            }
        }
    }

    /// Promote the model's image or find one in the corpus.
    async fn attach_image(
        &self,
        project: &Project,
        qas: &[QuestionAnswer],
        turn: &ChatTurn,
        bot_response_id: Option<Uuid>,
    ) -> Option<ImageRef> {
        if let Some(url) = turn.payload().image_url().map(str::to_string) {
            let image = ImageRef {
                url: self.media.resolve(&url),
                description: turn
                    .data
                    .get("image")
                    .and_then(|img| img.get("caption"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            };
            if let Some(qa_id) = turn.matched_qa {
                self.record_qa_image(project, bot_response_id, qa_id, &image, json!({
                    "qa_id": qa_id,
                    "method": "router",
                }))
                .await;
            }
            return Some(image);
        }

        let QaMatch { qa, score, method } =
            self.matcher.handler_match(qas, &turn.question, &turn.message)?;
        let image = ImageRef {
            url: self.media.resolve(qa.image.as_deref().unwrap_or_default()),
            description: qa.caption(),
        };
        self.record_qa_image(project, bot_response_id, qa.id, &image, json!({
            "qa_id": qa.id,
            "score": score,
            "method": method,
        }))
        .await;
        Some(image)
    }

    async fn record_qa_image(
        &self,
        project: &Project,
        bot_response_id: Option<Uuid>,
        qa_id: Uuid,
        image: &ImageRef,
        event: Value,
    ) {
        if let Some(response_id) = bot_response_id {
            let qa_image = json!({
                "qa_id": qa_id,
                "url": image.url,
                "description": image.description,
            });
            if let Err(e) = self.store.attach_qa_image(response_id, qa_image).await {
                warn!(project_id = %project.id, error = %e, "Failed to store QA image on response");
            }
        }
        self.track(project.id, EventType::QaImageMatched, event).await;
    }

    /// Store visitor feedback. Always acknowledges; `ok` reports persistence.
    #[instrument(skip(self, project, req), fields(project_id = %project.id))]
    pub async fn submit_feedback(&self, project: &Project, req: FeedbackRequest) -> FeedbackAck {
        let bot_response_id = match req.bot_response_id {
            Some(id) => match self.store.bot_response(project.id, id).await {
                Ok(found) => found.map(|r| r.id),
                Err(e) => {
                    warn!(error = %e, "Failed to look up bot response for feedback");
                    None
                }
            },
            None => None,
        };

        let feedback = NewFeedback {
            project_id: project.id,
            question: req.question.unwrap_or_default(),
            response: req.response.unwrap_or_default(),
            rating: req.rating,
            comment: req.comment.unwrap_or_default(),
            selected_option: req.selected_option.filter(|s| !s.is_empty()),
            bot_response_id,
        };

        match self.store.create_feedback(feedback).await {
            Ok(saved) => {
                self.track(
                    project.id,
                    EventType::FeedbackSubmitted,
                    json!({
                        "feedback_id": saved.id,
                        "rating": saved.rating,
                        "selected_option": saved.selected_option,
                    }),
                )
                .await;
                FeedbackAck {
                    ok: true,
                    feedback_id: Some(saved.id),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to save feedback");
                FeedbackAck {
                    ok: false,
                    feedback_id: None,
                }
            }
        }
    }
}
