//! Picks a project image to attach to a chat reply.
//!
//! Two independent strategies exist. The router uses [`ImageMatcher::router_match`]
//! (exact, substring, then "the user asked for a picture"). The request
//! handler uses [`ImageMatcher::handler_match`] (exact, contains, then a fuzzy
//! score with an acceptance threshold).

use serde::Serialize;

use crate::domain::QuestionAnswer;
use crate::services::similarity::{sequence_ratio, token_overlap};

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.45;

/// Words that signal the user wants to see something.
pub const VISUAL_KEYWORDS: [&str; 6] = ["image", "photo", "picture", "show", "visual", "see"];

/// How a QA entry was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Contains,
    Substring,
    Keyword,
    Fuzzy,
}

#[derive(Debug, Clone)]
pub struct QaMatch<'a> {
    pub qa: &'a QuestionAnswer,
    pub score: f64,
    pub method: MatchMethod,
}

/// Best and runner-up fuzzy candidates, for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Ranking<'a> {
    pub best: Option<(&'a QuestionAnswer, f64)>,
    pub second: Option<(&'a QuestionAnswer, f64)>,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageMatcher {
    threshold: f64,
}

impl Default for ImageMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl ImageMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Router strategy. Only entries with an image are candidates.
    pub fn router_match<'a>(
        &self,
        qas: &'a [QuestionAnswer],
        question: &str,
    ) -> Option<QaMatch<'a>> {
        let user_q = question.trim().to_lowercase();
        let with_image = || qas.iter().filter(|qa| qa.has_image());

        if !user_q.is_empty() {
            if let Some(qa) = with_image().find(|qa| eq_ignore_case(&qa.question, &user_q)) {
                return Some(QaMatch {
                    qa,
                    score: 1.0,
                    method: MatchMethod::Exact,
                });
            }

            if let Some(qa) = with_image().find(|qa| {
                qa.question.to_lowercase().contains(&user_q)
                    || qa.answer.to_lowercase().contains(&user_q)
            }) {
                return Some(QaMatch {
                    qa,
                    score: 1.0,
                    method: MatchMethod::Substring,
                });
            }
        }

        if VISUAL_KEYWORDS.iter().any(|k| user_q.contains(k)) {
            return with_image().next().map(|qa| QaMatch {
                qa,
                score: 0.0,
                method: MatchMethod::Keyword,
            });
        }

        None
    }

    /// Case-insensitive exact, then "QA question contains the user question",
    /// over entries with an image.
    pub fn direct_match<'a>(qas: &'a [QuestionAnswer], question: &str) -> Option<QaMatch<'a>> {
        let user_q = question.trim().to_lowercase();
        if user_q.is_empty() {
            return None;
        }
        let with_image = || qas.iter().filter(|qa| qa.has_image());

        if let Some(qa) = with_image().find(|qa| eq_ignore_case(&qa.question, &user_q)) {
            return Some(QaMatch {
                qa,
                score: 1.0,
                method: MatchMethod::Exact,
            });
        }

        with_image()
            .find(|qa| qa.question.to_lowercase().contains(&user_q))
            .map(|qa| QaMatch {
                qa,
                score: 1.0,
                method: MatchMethod::Contains,
            })
    }

    /// Handler strategy: exact, then contains, then fuzzy above threshold.
    pub fn handler_match<'a>(
        &self,
        qas: &'a [QuestionAnswer],
        question: &str,
        message: &str,
    ) -> Option<QaMatch<'a>> {
        if question.trim().is_empty() {
            return None;
        }
        if let Some(m) = Self::direct_match(qas, question) {
            return Some(m);
        }

        let candidates = qas.iter().filter(|qa| qa.has_image());
        let (qa, score) = self.rank(candidates, question, message).best?;
        (score >= self.threshold).then_some(QaMatch {
            qa,
            score,
            method: MatchMethod::Fuzzy,
        })
    }

    /// Fuzzy score of one QA question against the user question and the
    /// model message. Inputs are expected lowercased and trimmed.
    pub fn score(question: &str, message: &str, qa_question: &str) -> f64 {
        let mut signals = [0.0f64; 4];
        if !question.is_empty() {
            signals[0] = sequence_ratio(question, qa_question);
            signals[2] = token_overlap(question, qa_question);
        }
        if !message.is_empty() {
            signals[1] = sequence_ratio(message, qa_question);
            signals[3] = token_overlap(message, qa_question);
        }
        signals.into_iter().fold(0.0, f64::max)
    }

    /// Rank candidates by fuzzy score. Strictly greater wins, so the first
    /// maximum in corpus order is kept.
    pub fn rank<'a, I>(&self, candidates: I, question: &str, message: &str) -> Ranking<'a>
    where
        I: IntoIterator<Item = &'a QuestionAnswer>,
    {
        let q = question.trim().to_lowercase();
        let msg = message.trim().to_lowercase();

        let mut ranking = Ranking::default();
        let (mut best_score, mut second_score) = (0.0f64, 0.0f64);

        for qa in candidates {
            let qa_q = qa.question.trim().to_lowercase();
            if qa_q.is_empty() {
                continue;
            }
            let score = Self::score(&q, &msg, &qa_q);
            if score > best_score {
                ranking.second = ranking.best;
                second_score = best_score;
                ranking.best = Some((qa, score));
                best_score = score;
            } else if score > second_score {
                ranking.second = Some((qa, score));
                second_score = score;
            }
        }

        ranking
    }
}
