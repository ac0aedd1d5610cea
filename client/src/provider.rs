//! Seams to the identity provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Identity returned by a successful provider sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAssertion {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// What the consent step is asked to obtain from the upstream IdP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRequest {
    pub provider_id: String,
    pub scopes: Vec<String>,
    pub auth_domain: String,
}

impl ConsentRequest {
    /// Google consent asking for the profile and email scopes.
    pub fn google(auth_domain: impl Into<String>) -> Self {
        Self {
            provider_id: "google.com".to_string(),
            scopes: vec!["profile".to_string(), "email".to_string()],
            auth_domain: auth_domain.into(),
        }
    }
}

/// Credential produced by the upstream IdP's consent screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdpCredential {
    IdToken(String),
    AccessToken(String),
}

impl IdpCredential {
    /// Encode as the `postBody` expected by `accounts:signInWithIdp`.
    pub fn post_body(&self, provider_id: &str) -> String {
        match self {
            IdpCredential::IdToken(token) => format!("id_token={token}&providerId={provider_id}"),
            IdpCredential::AccessToken(token) => {
                format!("access_token={token}&providerId={provider_id}")
            }
        }
    }
}

/// Interactive consent step (the browser popup).
///
/// Implementations suspend until the user finishes or dismisses the prompt;
/// dismissal is reported as [`ProviderError::Dismissed`].
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    async fn request_consent(&self, request: &ConsentRequest) -> Result<IdpCredential, ProviderError>;
}

/// Session operations offered by the identity provider.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Run the popup sign-in and start a session.
    async fn sign_in_with_popup(&self) -> Result<IdentityAssertion, ProviderError>;

    /// End the current session, if any.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// ID token of the current session, refreshed when close to expiry.
    /// `Ok(None)` when nobody is signed in.
    async fn id_token(&self) -> Result<Option<String>, ProviderError>;
}
