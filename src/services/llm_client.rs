//! Chat-completion client for the external LLM API.
//!
//! Sends a prompt as a single user-role message and always hands back a
//! normalized [`ChatPayload`]. Transport failures and malformed replies turn
//! into sentinel payloads instead of errors.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use crate::config::Settings;
use crate::domain::ChatPayload;
use crate::services::normalizer::normalize;

pub const UNREACHABLE_MESSAGE: &str = "Sorry, I couldn't reach the AI service.";
pub const INVALID_REPLY_MESSAGE: &str = "Sorry, I couldn't fetch a valid response from the AI.";

/// Client for the chat-completion API.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    referer: String,
    title: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [CompletionMessage<'a>; 1],
}

#[derive(Serialize)]
struct CompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl LlmClient {
    /// Create a new client with a bounded request timeout.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.llm_timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(
            api_url = %settings.llm_api_url,
            model = %settings.llm_model,
            timeout_secs = settings.llm_timeout_seconds,
            "LLM client initialized"
        );

        Ok(Self {
            client,
            api_url: settings.llm_api_url.clone(),
            api_key: settings.llm_api_key.clone(),
            model: settings.llm_model.clone(),
            referer: settings.llm_referer.clone(),
            title: settings.llm_title.clone(),
        })
    }

    /// Send the prompt and normalize the reply.
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    pub async fn complete(&self, prompt: &str) -> ChatPayload {
        match self.fetch_content(prompt).await {
            Ok(content) => normalize(&content),
            Err(sentinel) => sentinel,
        }
    }

    /// Raw `choices[0].message.content`, or the sentinel payload to return.
    async fn fetch_content(&self, prompt: &str) -> Result<String, ChatPayload> {
        let body = CompletionRequest {
            model: &self.model,
            messages: [CompletionMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(url = %self.api_url, "Chat completion request");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, timeout = e.is_timeout(), "Chat completion request failed");
                ChatPayload::unknown(UNREACHABLE_MESSAGE)
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "Chat completion API returned an error");
            return Err(ChatPayload::unknown(INVALID_REPLY_MESSAGE));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse chat completion response");
            ChatPayload::unknown(INVALID_REPLY_MESSAGE)
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                warn!("Chat completion response has no message content");
                ChatPayload::unknown(INVALID_REPLY_MESSAGE)
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::Intent;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Completion body whose message content is `content`.
    pub(crate) fn completion(content: &str) -> serde_json::Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    async fn client_for(server: &MockServer) -> LlmClient {
        let settings = Settings::for_tests(&format!("{}/v1/chat/completions", server.uri()));
        LlmClient::new(&settings).unwrap()
    }

    #[tokio::test]
    async fn sends_single_user_message_and_normalizes_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("x-title", "Project Chatbot"))
            .and(body_partial_json(json!({
                "model": "test/model",
                "messages": [{"role": "user", "content": "PROMPT"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                "```json\n{\"intent\": \"greeting\", \"message\": \"Hello!\", \"data\": {}}\n```",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let payload = client_for(&server).await.complete("PROMPT").await;
        assert_eq!(payload.intent, Intent::Greeting);
        assert_eq!(payload.message, "Hello!");
    }

    #[tokio::test]
    async fn timeout_yields_unknown_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("{}"))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let payload = client_for(&server).await.complete("PROMPT").await;
        assert_eq!(payload.intent, Intent::Unknown);
        assert_eq!(payload.message, UNREACHABLE_MESSAGE);
        assert!(payload.data.is_empty());
    }

    #[tokio::test]
    async fn malformed_shape_yields_invalid_reply_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let payload = client_for(&server).await.complete("PROMPT").await;
        assert_eq!(payload.intent, Intent::Unknown);
        assert_eq!(payload.message, INVALID_REPLY_MESSAGE);
    }

    #[tokio::test]
    async fn error_status_yields_invalid_reply_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "bad"})))
            .mount(&server)
            .await;

        let payload = client_for(&server).await.complete("PROMPT").await;
        assert_eq!(payload.message, INVALID_REPLY_MESSAGE);
    }

    #[tokio::test]
    async fn unreachable_host_yields_unreachable_sentinel() {
        let settings = Settings::for_tests("http://127.0.0.1:9/v1/chat/completions");
        let payload = LlmClient::new(&settings).unwrap().complete("PROMPT").await;
        assert_eq!(payload.intent, Intent::Unknown);
        assert_eq!(payload.message, UNREACHABLE_MESSAGE);
    }
}
