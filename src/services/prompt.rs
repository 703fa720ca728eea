//! Strict context prompt for the per-project chatbot.

use crate::domain::{Language, QuestionAnswer};

/// Render the QA corpus as numbered `Q{n}`/`A{n}` pairs.
pub fn render_corpus(qas: &[QuestionAnswer]) -> String {
    qas.iter()
        .enumerate()
        .map(|(idx, qa)| {
            format!(
                "Q{n}: {q}\nA{n}: {a}",
                n = idx + 1,
                q = qa.question,
                a = qa.answer
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the prompt sent as the single user message of a chat turn.
pub fn build_context_prompt(qas: &[QuestionAnswer], question: &str, language: Language) -> String {
    let context = render_corpus(qas);
    let code = language.code();
    let label = language.label();

    format!(
        r#"
You are a strict assistant. Only answer based on the context provided below.
Do NOT make up any answers or add extra information.

The user's preferred language code is "{code}" and the corresponding
language is "{label}". You MUST write the "message" field of your
JSON response entirely in this language and be natural and fluent.

Context:
{context}

If the answer is not found in the above context, you MUST set "intent" to "unknown"
and respond with a helpful fallback message in the JSON "message" field in the same
language as requested above.

You MUST respond ONLY with a single valid JSON object with this exact structure
and no extra text before or after it:
{{
  "intent": "answer" | "lead" | "booking" | "greeting" | "unknown",
  "message": "text response to show to the user",
  "data": {{}}
}}

Note on images: If the correct response should include an image that exists in the
project's knowledge base, set the `data` field to include an `image` object with
non-sensitive descriptive fields only (the backend will attach the actual image URL
if available). Example:

    "data": {{"image": {{"reason": "illustrates the product feature", "caption": "Front view of Model X"}}}}

Do NOT include external URLs in the `image` field. Leave URL resolution to the
backend, which has access to project media.

User Question: {question}
"#
    )
}
