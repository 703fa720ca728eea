//! Lightweight English/Hindi detection for chat questions.

use crate::domain::Language;

const HINDI_MARKERS: [&str; 8] = [
    "namaste",
    "namaskar",
    "shukriya",
    "dhanyavaad",
    "kaise ho",
    "kya",
    "kyu",
    "nahi",
];

/// Devanagari script or common romanized Hindi words mean Hindi; anything
/// else is English. Blank input returns `default`.
pub fn detect_language(text: &str, default: Language) -> Language {
    let text = text.trim();
    if text.is_empty() {
        return default;
    }

    if text.chars().any(|ch| ('\u{0900}'..='\u{097F}').contains(&ch)) {
        return Language::Hi;
    }

    let lowered = text.to_lowercase();
    if HINDI_MARKERS.iter().any(|m| lowered.contains(m)) {
        return Language::Hi;
    }

    Language::En
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_devanagari_and_markers() {
        assert_eq!(detect_language("आप कब खुलते हैं?", Language::En), Language::Hi);
        assert_eq!(detect_language("Namaste, timing kya hai?", Language::En), Language::Hi);
        assert_eq!(detect_language("What are your hours?", Language::Hi), Language::En);
    }

    #[test]
    fn blank_text_keeps_default() {
        assert_eq!(detect_language("   ", Language::Hi), Language::Hi);
        assert_eq!(detect_language("", Language::En), Language::En);
    }
}
