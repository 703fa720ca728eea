//! Service layer: the chatbot pipeline, persistence and external clients.

pub mod analytics;
pub mod chat;
pub mod image_matcher;
pub mod intent_router;
pub mod language;
pub mod llm_client;
pub mod media;
pub mod normalizer;
pub mod prompt;
pub mod similarity;
pub mod store;
pub mod workflow;

pub use chat::ChatService;
pub use image_matcher::ImageMatcher;
pub use intent_router::IntentRouter;
pub use llm_client::LlmClient;
pub use media::MediaUrls;
pub use store::{ChatStore, MemoryStore, PgStore};
