//! `IdentityClient` backed by the Firebase Auth REST API.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::{ClientConfig, Endpoints};
use crate::error::ProviderError;
use crate::provider::{ConsentPrompt, ConsentRequest, IdentityAssertion, IdentityClient};

/// Tokens are refreshed once they are this close to expiring.
const REFRESH_MARGIN_SECS: i64 = 5 * 60;

#[derive(Debug, Clone)]
struct Session {
    uid: String,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) >= self.expires_at
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest {
    post_body: String,
    request_uri: String,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Firebase Auth client holding at most one signed-in session.
pub struct FirebaseAuthClient {
    http: reqwest::Client,
    config: ClientConfig,
    endpoints: Endpoints,
    prompt: Arc<dyn ConsentPrompt>,
    session: Mutex<Option<Session>>,
}

impl FirebaseAuthClient {
    pub fn new(config: ClientConfig, prompt: Arc<dyn ConsentPrompt>) -> Self {
        Self::with_endpoints(config, Endpoints::default(), prompt)
    }

    pub fn with_endpoints(
        config: ClientConfig,
        endpoints: Endpoints,
        prompt: Arc<dyn ConsentPrompt>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            endpoints,
            prompt,
            session: Mutex::new(None),
        }
    }

    /// UID of the signed-in user, if any.
    pub async fn current_uid(&self) -> Option<String> {
        self.session.lock().await.as_ref().map(|s| s.uid.clone())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ProviderError> {
        let url = format!("{}/v1/token", self.endpoints.secure_token);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        read_json(response).await
    }
}

#[async_trait]
impl IdentityClient for FirebaseAuthClient {
    async fn sign_in_with_popup(&self) -> Result<IdentityAssertion, ProviderError> {
        let request = ConsentRequest::google(&self.config.auth_domain);
        let credential = self.prompt.request_consent(&request).await?;

        let url = format!(
            "{}/v1/accounts:signInWithIdp",
            self.endpoints.identity_toolkit
        );
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&SignInWithIdpRequest {
                post_body: credential.post_body(&request.provider_id),
                request_uri: self.config.request_uri(),
                return_secure_token: true,
                return_idp_credential: true,
            })
            .send()
            .await?;

        let body: SignInWithIdpResponse = read_json(response).await?;
        let expires_at = Utc::now() + Duration::seconds(parse_expires_in(&body.expires_in)?);

        *self.session.lock().await = Some(Session {
            uid: body.local_id.clone(),
            id_token: body.id_token.clone(),
            refresh_token: body.refresh_token.clone(),
            expires_at,
        });

        tracing::debug!("Provider session started for uid {}", body.local_id);

        Ok(IdentityAssertion {
            uid: body.local_id,
            email: body.email.filter(|e| !e.is_empty()),
            display_name: body.display_name,
            id_token: Some(body.id_token),
            refresh_token: Some(body.refresh_token),
        })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if let Some(session) = self.session.lock().await.take() {
            tracing::debug!("Provider session ended for uid {}", session.uid);
        }
        Ok(())
    }

    async fn id_token(&self) -> Result<Option<String>, ProviderError> {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return Ok(None);
        };

        if !session.needs_refresh(Utc::now()) {
            return Ok(Some(session.id_token.clone()));
        }

        let refreshed = self.refresh(&session.refresh_token).await?;
        if refreshed.user_id != session.uid {
            return Err(ProviderError::InvalidResponse(
                "refreshed token belongs to a different user".to_string(),
            ));
        }

        session.expires_at =
            Utc::now() + Duration::seconds(parse_expires_in(&refreshed.expires_in)?);
        session.id_token = refreshed.id_token;
        session.refresh_token = refreshed.refresh_token;

        Ok(Some(session.id_token.clone()))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        return Err(ProviderError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

fn parse_expires_in(raw: &str) -> Result<i64, ProviderError> {
    raw.trim()
        .parse()
        .map_err(|_| ProviderError::InvalidResponse(format!("bad expiresIn value: {raw}")))
}
