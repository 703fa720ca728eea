//! Intent routing for a chat turn.
//!
//! classify → (lead → save_lead | unknown → fallback | other) → respond.
//! Built once at start-up and shared through application state.

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::domain::{ChatPayload, ChatTurn, Intent, Language, QuestionAnswer};
use crate::services::image_matcher::ImageMatcher;
use crate::services::llm_client::LlmClient;
use crate::services::prompt::build_context_prompt;

pub const FALLBACK_MESSAGE: &str =
    "I'm not sure how to handle that yet, but your message was received.";

/// Branch taken after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Respond,
    SaveLead,
    Fallback,
}

impl Route {
    pub fn for_intent(intent: Intent) -> Self {
        match intent {
            Intent::Lead => Self::SaveLead,
            Intent::Unknown => Self::Fallback,
            Intent::Answer | Intent::Booking | Intent::Greeting => Self::Respond,
        }
    }
}

#[derive(Clone)]
pub struct IntentRouter {
    client: LlmClient,
    matcher: ImageMatcher,
}

impl IntentRouter {
    pub fn new(client: LlmClient, matcher: ImageMatcher) -> Self {
        Self { client, matcher }
    }

    /// Run one chat turn through the model and the intent branches.
    #[instrument(skip(self, qas, question), fields(corpus = qas.len(), language = language.code()))]
    pub async fn route(
        &self,
        qas: &[QuestionAnswer],
        question: &str,
        language: Language,
    ) -> ChatTurn {
        let turn = self.classify(qas, question, language).await;

        let route = Route::for_intent(turn.intent);
        debug!(intent = %turn.intent, ?route, "Intent classified");

        let turn = match route {
            Route::SaveLead => Self::save_lead(turn),
            Route::Fallback => Self::fallback(turn),
            Route::Respond => turn,
        };
        Self::respond(turn)
    }

    async fn classify(&self, qas: &[QuestionAnswer], question: &str, language: Language) -> ChatTurn {
        let prompt = build_context_prompt(qas, question, language);
        let payload = self.client.complete(&prompt).await;
        self.enrich(payload, qas, question, language)
    }

    /// Attach a corpus image to an answer the model left without one.
    fn enrich(
        &self,
        payload: ChatPayload,
        qas: &[QuestionAnswer],
        question: &str,
        language: Language,
    ) -> ChatTurn {
        let has_url = payload.image_url().is_some();
        let mut turn = ChatTurn {
            question: question.to_string(),
            language,
            intent: payload.intent,
            message: payload.message,
            data: payload.data,
            matched_qa: None,
        };

        if turn.intent == Intent::Answer && !has_url {
            if let Some(m) = self.matcher.router_match(qas, question) {
                let mut image = Map::new();
                image.insert("url".into(), Value::String(m.qa.image.clone().unwrap_or_default()));
                image.insert("caption".into(), Value::String(m.qa.caption()));
                turn.data.insert("image".into(), Value::Object(image));
                turn.matched_qa = Some(m.qa.id);
                debug!(qa_id = %m.qa.id, method = ?m.method, "Router attached corpus image");
            }
        }

        turn
    }

    /// Lead persistence happens in the request handler.
    fn save_lead(turn: ChatTurn) -> ChatTurn {
        turn
    }

    fn fallback(mut turn: ChatTurn) -> ChatTurn {
        if turn.message.trim().is_empty() {
            turn.message = FALLBACK_MESSAGE.to_string();
        }
        turn
    }

    fn respond(turn: ChatTurn) -> ChatTurn {
        turn
    }
}
