//! HS256 bearer token verification

use anyhow::{Context, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use super::Claims;
use crate::config::Settings;

/// Validates tokens signed with the shared `JWT_SECRET`
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, issuer: Option<&str>, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        let mut required = vec!["exp", "sub", "aud"];
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
            required.push("iss");
        }
        validation.set_required_spec_claims(required.as_slice());

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.jwt_secret,
            settings.jwt_issuer.as_deref(),
            &settings.jwt_audience,
        )
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data =
            decode::<Claims>(token, &self.key, &self.validation).context("JWT validation failed")?;
        Ok(data.claims)
    }
}
