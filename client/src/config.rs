//! Identity-provider client configuration.

use std::env;

const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com";

/// Firebase web-app configuration.
///
/// The client is only initialized when every value is present.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

impl ClientConfig {
    /// Load client configuration from environment variables.
    ///
    /// Missing variables are left empty; check [`ClientConfig::is_complete`]
    /// before building a client.
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).unwrap_or_default();
        Self {
            api_key: var("FIREBASE_API_KEY"),
            auth_domain: var("FIREBASE_AUTH_DOMAIN"),
            project_id: var("FIREBASE_PROJECT_ID"),
            storage_bucket: var("FIREBASE_STORAGE_BUCKET"),
            messaging_sender_id: var("FIREBASE_MESSAGING_SENDER_ID"),
            app_id: var("FIREBASE_APP_ID"),
        }
    }

    pub fn is_complete(&self) -> bool {
        [
            &self.api_key,
            &self.auth_domain,
            &self.project_id,
            &self.storage_bucket,
            &self.messaging_sender_id,
            &self.app_id,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
    }

    /// Redirect URI registered for the provider's hosted auth handler.
    pub fn request_uri(&self) -> String {
        format!("https://{}/__/auth/handler", self.auth_domain)
    }
}

/// Base URLs of the provider's REST services.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub identity_toolkit: String,
    pub secure_token: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            identity_toolkit: DEFAULT_IDENTITY_TOOLKIT_URL.to_string(),
            secure_token: DEFAULT_SECURE_TOKEN_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Point both services at one base URL (used against a mock server).
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            identity_toolkit: base.clone(),
            secure_token: base,
        }
    }
}
