//! Coerces raw model text into the `{intent, message, data}` contract.

use serde_json::{Map, Value};

use crate::domain::{ChatPayload, Intent};

pub const EMPTY_REPLY_MESSAGE: &str = "Sorry, I couldn't fetch a response from the AI.";

/// Normalize raw model output. Never fails.
pub fn normalize(raw_text: &str) -> ChatPayload {
    let raw = raw_text.trim();
    let fallback_message = if raw.is_empty() {
        EMPTY_REPLY_MESSAGE
    } else {
        raw
    };

    let candidate = strip_code_fence(raw);

    let parsed = match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(obj)) => obj,
        Ok(_) | Err(_) => {
            tracing::debug!("Model reply is not a JSON object, using fallback payload");
            return ChatPayload::unknown(fallback_message);
        }
    };

    let intent = parsed
        .get("intent")
        .and_then(Value::as_str)
        .and_then(Intent::parse)
        .unwrap_or(Intent::Unknown);

    let message = parsed
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(fallback_message)
        .to_string();

    let mut data = match parsed.get("data") {
        Some(Value::Object(d)) => d.clone(),
        _ => Map::new(),
    };

    if let Some(image) = data.remove("image") {
        if let Some(normalized) = normalize_image(&image) {
            data.insert("image".to_string(), normalized);
        }
    }

    ChatPayload {
        intent,
        message,
        data,
    }
}

/// Unwrap "```json\n{...}\n```" style replies. Returns the input unchanged
/// when it is not fenced.
pub fn strip_code_fence(text: &str) -> &str {
    if !text.starts_with("```") {
        return text;
    }
    let parts: Vec<&str> = text.split("```").collect();
    if parts.len() < 3 {
        return text;
    }
    let inner = parts[1];
    let inner = match inner.split_once('\n') {
        Some((_lang, rest)) => rest,
        None => inner,
    };
    inner.trim()
}

fn non_blank(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Keep `url`/`caption`, else `reason`, else drop.
fn normalize_image(image: &Value) -> Option<Value> {
    let obj = image.as_object()?;

    let mut out = Map::new();
    if let Some(url) = non_blank(obj.get("url")) {
        out.insert("url".to_string(), Value::String(url));
    }
    if let Some(caption) =
        non_blank(obj.get("caption")).or_else(|| non_blank(obj.get("description")))
    {
        out.insert("caption".to_string(), Value::String(caption));
    }
    if !out.is_empty() {
        return Some(Value::Object(out));
    }

    non_blank(obj.get("reason")).map(|reason| {
        let mut m = Map::new();
        m.insert("reason".to_string(), Value::String(reason));
        Value::Object(m)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_value(p: &ChatPayload) -> Value {
        serde_json::to_value(p).unwrap()
    }

    #[test]
    fn always_yields_three_keys_with_valid_intent() {
        let inputs = [
            "",
            "   ",
            "plain text answer",
            "[1, 2, 3]",
            "42",
            "null",
            r#"{"intent": "sell", "message": 7, "data": []}"#,
            r#"{"intent": "answer", "message": "ok", "data": {"x": 1}}"#,
            "```json\n{\"intent\": \"lead\"}\n```",
            "```",
        ];
        for input in inputs {
            let v = as_value(&normalize(input));
            let obj = v.as_object().unwrap();
            assert_eq!(obj.len(), 3, "input {input:?}");
            assert!(obj["data"].is_object());
            assert!(obj["message"].as_str().is_some_and(|m| !m.is_empty()));
            let intent = obj["intent"].as_str().unwrap();
            assert!(Intent::parse(intent).is_some(), "input {input:?}");
        }
    }

    #[test]
    fn fenced_json_matches_bare_json() {
        let bare = r#"{"intent": "answer", "message": "We open at 9.", "data": {"confidence": 0.9}}"#;
        let fenced = format!("```json\n{bare}\n```");
        assert_eq!(normalize(&fenced), normalize(bare));
        assert_eq!(normalize(&format!("```{bare}```")), normalize(bare));
        assert_eq!(normalize(bare).intent, Intent::Answer);
    }

    #[test]
    fn free_text_falls_back_to_raw_message() {
        let p = normalize("  Our office is closed on Sundays.  ");
        assert_eq!(p.intent, Intent::Unknown);
        assert_eq!(p.message, "Our office is closed on Sundays.");
        assert!(p.data.is_empty());

        assert_eq!(normalize("").message, EMPTY_REPLY_MESSAGE);
    }

    #[test]
    fn invalid_fields_are_coerced() {
        let p = normalize(r#"{"intent": "Answer", "message": "   ", "data": "nope"}"#);
        assert_eq!(p.intent, Intent::Unknown);
        // Blank message falls back to the raw text
        assert!(p.message.starts_with('{'));
        assert!(p.data.is_empty());
    }

    #[test]
    fn image_keeps_only_url_and_caption() {
        let p = normalize(
            &json!({
                "intent": "answer",
                "message": "Here it is",
                "data": {"image": {"url": " /media/a.png ", "caption": "Front", "secret": "x"}}
            })
            .to_string(),
        );
        assert_eq!(p.data["image"], json!({"url": "/media/a.png", "caption": "Front"}));
        assert_eq!(p.image_url(), Some("/media/a.png"));
    }

    #[test]
    fn image_description_counts_as_caption() {
        let p = normalize(
            &json!({"intent": "answer", "message": "m", "data": {"image": {"description": "Side view"}}})
                .to_string(),
        );
        assert_eq!(p.data["image"], json!({"caption": "Side view"}));
        assert_eq!(p.image_url(), None);
    }

    #[test]
    fn image_with_only_reason_keeps_reason() {
        let p = normalize(
            &json!({"intent": "answer", "message": "m", "data": {"image": {"reason": "shows the lobby", "url": ""}}})
                .to_string(),
        );
        assert_eq!(p.data["image"], json!({"reason": "shows the lobby"}));
    }

    #[test]
    fn empty_image_is_removed() {
        let p = normalize(
            &json!({"intent": "answer", "message": "m", "data": {"image": {"url": " ", "note": "x"}, "keep": true}})
                .to_string(),
        );
        assert!(!p.data.contains_key("image"));
        assert_eq!(p.data["keep"], json!(true));

        let p = normalize(
            &json!({"intent": "answer", "message": "m", "data": {"image": "a.png"}}).to_string(),
        );
        assert!(!p.data.contains_key("image"));
    }
}
