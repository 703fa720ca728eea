use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::chat::Intent;

/// Project entity. One per owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub bot_key: String,
    /// Empty means every intent is allowed.
    pub allowed_intents: Vec<Intent>,
    pub workflow_config: Value,
    pub voice_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn allows(&self, intent: Intent) -> bool {
        self.allowed_intents.is_empty() || self.allowed_intents.contains(&intent)
    }
}

/// Generate an opaque 32-character alphanumeric bot key.
pub fn generate_bot_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Question/answer entry of a project's corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub id: Uuid,
    pub project_id: Uuid,
    pub question: String,
    pub answer: String,
    /// Media-relative path (e.g. `answers/hours.png`) or absolute URL
    pub image: Option<String>,
    pub image_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QuestionAnswer {
    pub fn has_image(&self) -> bool {
        self.image.as_deref().is_some_and(|i| !i.trim().is_empty())
    }

    pub fn caption(&self) -> String {
        self.image_description.clone().unwrap_or_default()
    }
}

/// Max length of a QA question.
pub const QUESTION_MAX_LEN: usize = 255;

/// Max length of a QA image caption.
pub const IMAGE_DESCRIPTION_MAX_LEN: usize = 255;

/// Request DTO for creating a project
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub allowed_intents: Vec<Intent>,
    #[serde(default)]
    pub workflow_config: Option<Value>,
    #[serde(default)]
    pub voice_enabled: bool,
}

/// Request DTO for updating a project
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub allowed_intents: Option<Vec<Intent>>,
    #[serde(default)]
    pub workflow_config: Option<Value>,
    #[serde(default)]
    pub voice_enabled: Option<bool>,
}

/// Fields for a new project row
#[derive(Debug, Clone)]
pub struct NewProject {
    pub owner_id: Uuid,
    pub name: String,
    pub bot_key: String,
    pub allowed_intents: Vec<Intent>,
    pub workflow_config: Value,
    pub voice_enabled: bool,
}

/// Request DTO for creating or replacing a QA entry
#[derive(Debug, Clone, Deserialize)]
pub struct QaRequest {
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_description: Option<String>,
}

impl QaRequest {
    /// Trims fields and checks length limits.
    pub fn validated(mut self) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();
        self.question = self.question.trim().to_string();
        if self.question.is_empty() {
            errors.push("question must not be empty".to_string());
        }
        if self.question.chars().count() > QUESTION_MAX_LEN {
            errors.push(format!(
                "question must be at most {} characters",
                QUESTION_MAX_LEN
            ));
        }
        self.image = self.image.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self.image_description = self
            .image_description
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if self
            .image_description
            .as_ref()
            .is_some_and(|d| d.chars().count() > IMAGE_DESCRIPTION_MAX_LEN)
        {
            errors.push(format!(
                "image_description must be at most {} characters",
                IMAGE_DESCRIPTION_MAX_LEN
            ));
        }

        if errors.is_empty() {
            Ok(self)
        } else {
            Err(errors)
        }
    }
}

/// Public bootstrap data for the embeddable widget
#[derive(Debug, Clone, Serialize)]
pub struct EmbedProjectResponse {
    pub project_id: Uuid,
    pub name: String,
    pub voice_enabled: bool,
}

impl From<Project> for EmbedProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            project_id: p.id,
            name: p.name,
            voice_enabled: p.voice_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(allowed: Vec<Intent>) -> Project {
        Project {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Demo".into(),
            bot_key: generate_bot_key(),
            allowed_intents: allowed,
            workflow_config: Value::Object(Default::default()),
            voice_enabled: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_allow_list_allows_everything() {
        let p = project(vec![]);
        assert!(Intent::ALL.iter().all(|i| p.allows(*i)));

        let p = project(vec![Intent::Answer]);
        assert!(p.allows(Intent::Answer));
        assert!(!p.allows(Intent::Lead));
    }

    #[test]
    fn bot_key_is_32_alphanumerics() {
        let key = generate_bot_key();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn qa_request_validation_trims_and_rejects_blank() {
        let req = QaRequest {
            question: "  Hours?  ".into(),
            answer: "9-5".into(),
            image: Some("   ".into()),
            image_description: None,
        };
        let ok = req.validated().unwrap();
        assert_eq!(ok.question, "Hours?");
        assert!(ok.image.is_none());

        let bad = QaRequest {
            question: " ".into(),
            answer: String::new(),
            image: None,
            image_description: None,
        };
        assert!(bad.validated().is_err());
    }

    #[test]
    fn qa_request_rejects_long_image_description() {
        let req = |description: String| QaRequest {
            question: "Menu?".into(),
            answer: String::new(),
            image: Some("menu.png".into()),
            image_description: Some(description),
        };

        let at_limit = "é".repeat(IMAGE_DESCRIPTION_MAX_LEN);
        assert!(req(at_limit).validated().is_ok());

        let errors = req("x".repeat(IMAGE_DESCRIPTION_MAX_LEN + 1))
            .validated()
            .unwrap_err();
        assert_eq!(
            errors,
            vec!["image_description must be at most 255 characters".to_string()]
        );
    }
}
