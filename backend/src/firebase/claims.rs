use serde::{Deserialize, Serialize};

/// Claims of a Firebase ID token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseClaims {
    /// Subject (Firebase uid)
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub auth_time: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub firebase: Option<FirebaseInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirebaseInfo {
    #[serde(default)]
    pub sign_in_provider: Option<String>,
}

/// Claims of a custom token minted with the service account key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<serde_json::Map<String, serde_json::Value>>,
}
