//! Rows written as side effects of chat turns: leads, bot responses,
//! conversation memory and feedback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLead {
    pub project_id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub question: String,
    pub response: String,
    pub confidence: Option<f64>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBotResponse {
    pub project_id: Uuid,
    pub question: String,
    pub response: String,
    pub confidence: Option<f64>,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct ContextEntry {
    pub project_id: Uuid,
    pub session_key: Option<String>,
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub project_id: Uuid,
    pub question: String,
    pub response: String,
    pub rating: Option<i32>,
    pub comment: String,
    pub selected_option: Option<String>,
    pub bot_response_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub project_id: Uuid,
    pub question: String,
    pub response: String,
    pub rating: Option<i32>,
    pub comment: String,
    pub selected_option: Option<String>,
    pub bot_response_id: Option<Uuid>,
}

/// Request DTO for feedback on a bot response
///
/// Fields of the wrong JSON type degrade to `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: Option<i32>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub selected_option: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub question: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub response: Option<String>,
    #[serde(default, deserialize_with = "lenient_uuid")]
    pub bot_response_id: Option<Uuid>,
}

/// Integer rating from a number or numeric string; fractions are rounded.
fn lenient_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number
        .filter(|n| n.is_finite() && (i32::MIN as f64..=i32::MAX as f64).contains(n))
        .map(|n| n.round() as i32))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Unparseable ids mean "no linked response".
fn lenient_uuid<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Uuid>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Uuid::parse_str(s.trim()).ok(),
        _ => None,
    })
}

/// Feedback acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> FeedbackRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn rating_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse(json!({"rating": 4})).rating, Some(4));
        assert_eq!(parse(json!({"rating": " 5 "})).rating, Some(5));
        assert_eq!(parse(json!({"rating": 4.5})).rating, Some(5));
        assert_eq!(parse(json!({"rating": "great"})).rating, None);
        assert_eq!(parse(json!({"rating": null})).rating, None);
        assert_eq!(parse(json!({})).rating, None);
    }

    #[test]
    fn malformed_fields_degrade_to_none() {
        let req = parse(json!({
            "bot_response_id": "12",
            "comment": ["not", "text"],
            "selected_option": 2
        }));
        assert_eq!(req.bot_response_id, None);
        assert_eq!(req.comment, None);
        assert_eq!(req.selected_option.as_deref(), Some("2"));

        let id = Uuid::new_v4();
        assert_eq!(parse(json!({"bot_response_id": id})).bot_response_id, Some(id));
    }
}
