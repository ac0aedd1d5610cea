//! Allow-list gated sign-in.

use std::sync::Arc;

use shared::AllowList;

use crate::config::ClientConfig;
use crate::error::SignInError;
use crate::firebase::FirebaseAuthClient;
use crate::provider::{ConsentPrompt, IdentityAssertion, IdentityClient};

/// Environment variable holding the comma-separated allow-list.
pub const AUTHORIZED_EMAILS_VAR: &str = "AUTHORIZED_EMAILS";

/// Sign-in flow for the admin panel.
///
/// Built without a client when the provider configuration is incomplete, in
/// which case sign-in and sign-out fail with [`SignInError::Configuration`].
pub struct SignInFlow {
    client: Option<Arc<dyn IdentityClient>>,
    allow_list: AllowList,
}

impl SignInFlow {
    pub fn new(client: Option<Arc<dyn IdentityClient>>, allow_list: AllowList) -> Self {
        Self { client, allow_list }
    }

    /// Build the flow from `FIREBASE_*` and `AUTHORIZED_EMAILS` variables.
    pub fn from_env(prompt: Arc<dyn ConsentPrompt>) -> Self {
        let config = ClientConfig::from_env();
        let client: Option<Arc<dyn IdentityClient>> = if config.is_complete() {
            Some(Arc::new(FirebaseAuthClient::new(config, prompt)))
        } else {
            tracing::warn!(
                "Firebase configuration is incomplete. Some features will be disabled. \
                 Please set all FIREBASE_* environment variables."
            );
            None
        };

        Self::new(client, AllowList::from_env(AUTHORIZED_EMAILS_VAR))
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Sign in through the provider popup.
    ///
    /// A session that fails the allow-list check is signed out again before
    /// the error is returned. If that sign-out fails the provider error is
    /// returned instead, since the session may still be live.
    pub async fn sign_in(&self) -> Result<IdentityAssertion, SignInError> {
        let client = self.client.as_deref().ok_or(SignInError::Configuration)?;

        let assertion = client.sign_in_with_popup().await.map_err(|e| {
            tracing::error!("Google sign-in error: {:?}", e);
            SignInError::from(e)
        })?;

        let Some(email) = assertion.email.as_deref() else {
            tracing::warn!("Sign-in for uid {} returned no email", assertion.uid);
            revoke(client).await?;
            return Err(SignInError::MissingEmail);
        };

        if !self.allow_list.is_authorized(email) {
            tracing::warn!("Unauthorized sign-in attempt from: {}", email);
            revoke(client).await?;
            return Err(SignInError::Unauthorized {
                email: email.to_string(),
            });
        }

        tracing::info!("Successful sign-in for: {}", email);
        Ok(assertion)
    }

    /// Sign the current user out.
    pub async fn sign_out(&self) -> Result<(), SignInError> {
        let client = self.client.as_deref().ok_or(SignInError::Configuration)?;

        client.sign_out().await.map_err(|e| {
            tracing::error!("Sign out error: {:?}", e);
            SignInError::from(e)
        })
    }

    /// Current ID token for backend calls, or `None` when signed out,
    /// unconfigured, or the refresh failed.
    pub async fn bearer_token(&self) -> Option<String> {
        let Some(client) = self.client.as_deref() else {
            tracing::warn!("Firebase authentication is not configured.");
            return None;
        };

        match client.id_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Error getting ID token: {:?}", e);
                None
            }
        }
    }
}

async fn revoke(client: &dyn IdentityClient) -> Result<(), SignInError> {
    client.sign_out().await.map_err(|e| {
        tracing::error!("Failed to revoke rejected session: {:?}", e);
        SignInError::from(e)
    })
}
