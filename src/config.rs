use anyhow::{bail, Context, Result};
use std::env;

use crate::services::image_matcher::DEFAULT_MATCH_THRESHOLD;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,
    pub max_body_bytes: usize,

    // Database (None = in-memory store, dev only)
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Bearer token verification
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: String,

    // Chat-completion backend
    pub llm_api_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub llm_timeout_seconds: u64,
    pub llm_referer: String,
    pub llm_title: String,

    // Media resolution
    pub public_base_url: String,
    pub media_url: String,

    // Image matching
    pub image_match_threshold: f64,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let max_body_bytes = env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1024 * 1024);

        // Database
        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty());
        if database_url.is_none() && !env.is_dev() {
            bail!("DATABASE_URL must be set outside the dev environment");
        }
        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Bearer tokens
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = env::var("JWT_ISSUER").ok().filter(|s| !s.is_empty());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authenticated".to_string());

        // Chat-completion backend
        let llm_api_url = env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://openrouter.ai/api/v1/chat/completions".to_string());
        let llm_api_key = env::var("LLM_API_KEY").context("LLM_API_KEY must be set")?;
        let llm_model =
            env::var("LLM_MODEL").unwrap_or_else(|_| "google/gemma-3-12b-it:free".to_string());
        let llm_timeout_seconds = env::var("LLM_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let llm_referer =
            env::var("LLM_REFERER").unwrap_or_else(|_| "http://localhost:8080/".to_string());
        let llm_title = env::var("LLM_TITLE").unwrap_or_else(|_| "Project Chatbot".to_string());

        // Media
        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        url::Url::parse(&public_base_url).context("PUBLIC_BASE_URL must be an absolute URL")?;
        let media_url = env::var("MEDIA_URL").unwrap_or_else(|_| "/media/".to_string());

        let image_match_threshold =
            parse_match_threshold(env::var("IMAGE_MATCH_THRESHOLD").ok().as_deref())?;

        Ok(Settings {
            env,
            server_addr,
            max_body_bytes,
            database_url,
            database_max_connections,
            cors_allow_origins,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            llm_api_url,
            llm_api_key,
            llm_model,
            llm_timeout_seconds,
            llm_referer,
            llm_title,
            public_base_url,
            media_url,
            image_match_threshold,
        })
    }
}

#[cfg(test)]
impl Settings {
    /// Settings for router tests; the backend URL points at a mock server.
    pub fn for_tests(llm_api_url: &str) -> Self {
        Settings {
            env: Environment::Dev,
            server_addr: "127.0.0.1:0".to_string(),
            max_body_bytes: 1024 * 1024,
            database_url: None,
            database_max_connections: 1,
            cors_allow_origins: vec!["http://localhost:3000".to_string()],
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: None,
            jwt_audience: "authenticated".to_string(),
            llm_api_url: llm_api_url.to_string(),
            llm_api_key: "test-key".to_string(),
            llm_model: "test/model".to_string(),
            llm_timeout_seconds: 2,
            llm_referer: "http://localhost:8080/".to_string(),
            llm_title: "Project Chatbot".to_string(),
            public_base_url: "http://bot.test".to_string(),
            media_url: "/media/".to_string(),
            image_match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

/// Unset or blank means the default; anything else must be a number in `0.0..=1.0`.
fn parse_match_threshold(raw: Option<&str>) -> Result<f64> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_MATCH_THRESHOLD);
    };
    let threshold: f64 = raw
        .parse()
        .with_context(|| format!("IMAGE_MATCH_THRESHOLD must be a number, got '{raw}'"))?;
    if !(0.0..=1.0).contains(&threshold) {
        bail!("IMAGE_MATCH_THRESHOLD must be between 0.0 and 1.0, got {raw}");
    }
    Ok(threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_threshold_is_validated() {
        assert_eq!(parse_match_threshold(None).unwrap(), DEFAULT_MATCH_THRESHOLD);
        assert_eq!(parse_match_threshold(Some("  ")).unwrap(), DEFAULT_MATCH_THRESHOLD);
        assert_eq!(parse_match_threshold(Some("0.6")).unwrap(), 0.6);
        assert_eq!(parse_match_threshold(Some("1")).unwrap(), 1.0);

        assert!(parse_match_threshold(Some("high")).is_err());
        assert!(parse_match_threshold(Some("NaN")).is_err());
        assert!(parse_match_threshold(Some("inf")).is_err());
        assert!(parse_match_threshold(Some("-0.1")).is_err());
        assert!(parse_match_threshold(Some("1.5")).is_err());
    }

    #[test]
    fn environment_parsing_defaults_to_dev() {
        assert_eq!(Environment::from_str("production"), Environment::Prod);
        assert_eq!(Environment::from_str("PROD"), Environment::Prod);
        assert_eq!(Environment::from_str("staging"), Environment::Staging);
        assert_eq!(Environment::from_str("whatever"), Environment::Dev);
        assert!(Environment::Dev.is_dev());
        assert!(!Environment::Staging.is_prod());
    }
}
