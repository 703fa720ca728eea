use serde::{Deserialize, Serialize};

/// JWT claims accepted by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp) - optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Issuer - optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// User email - optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// User role - optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}
