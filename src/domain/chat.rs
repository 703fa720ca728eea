//! Chat turn types: the intent set, the normalized model payload and the
//! request/response DTOs of the chatbot endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Closed set of chat intents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Answer,
    Lead,
    Booking,
    Greeting,
    Unknown,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::Answer,
        Intent::Lead,
        Intent::Booking,
        Intent::Greeting,
        Intent::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Answer => "answer",
            Self::Lead => "lead",
            Self::Booking => "booking",
            Self::Greeting => "greeting",
            Self::Unknown => "unknown",
        }
    }

    /// Exact literal match only; anything else is not an intent.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.as_str() == s)
    }
}

impl Default for Intent {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported reply languages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Hi,
}

impl Language {
    /// Lenient parse: anything other than `hi` (any case) is English.
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(|c| c.trim().to_lowercase()) {
            Some(c) if c == "hi" => Self::Hi,
            _ => Self::En,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "Hindi",
        }
    }
}

/// The fixed three-field contract every model reply is coerced into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatPayload {
    pub intent: Intent,
    pub message: String,
    pub data: Map<String, Value>,
}

impl ChatPayload {
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            intent: Intent::Unknown,
            message: message.into(),
            data: Map::new(),
        }
    }

    /// URL of the image carried in `data.image`, if any.
    pub fn image_url(&self) -> Option<&str> {
        self.data
            .get("image")
            .and_then(|img| img.get("url"))
            .and_then(Value::as_str)
            .filter(|u| !u.trim().is_empty())
    }
}

/// State threaded through the router for one chat turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub question: String,
    pub language: Language,
    pub intent: Intent,
    pub message: String,
    pub data: Map<String, Value>,
    /// QA entry whose image the router attached.
    pub matched_qa: Option<Uuid>,
}

impl ChatTurn {
    pub fn payload(&self) -> ChatPayload {
        ChatPayload {
            intent: self.intent,
            message: self.message.clone(),
            data: self.data.clone(),
        }
    }
}

/// Image reference returned to the widget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageRef {
    pub url: String,
    pub description: String,
}

/// Request for a chat turn.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
    /// Language of the previous turn, used as the detection default.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response for a chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub intent: Intent,
    pub data: Map<String, Value>,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_response_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcq: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarify: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_parse_is_exact() {
        assert_eq!(Intent::parse("lead"), Some(Intent::Lead));
        assert_eq!(Intent::parse("Lead"), None);
        assert_eq!(Intent::parse("sales"), None);
        assert_eq!(serde_json::to_value(Intent::Greeting).unwrap(), "greeting");
    }

    #[test]
    fn language_codes_fall_back_to_english() {
        assert_eq!(Language::from_code(Some("HI")), Language::Hi);
        assert_eq!(Language::from_code(Some("fr")), Language::En);
        assert_eq!(Language::from_code(None), Language::En);
        assert_eq!(Language::Hi.label(), "Hindi");
    }
}
