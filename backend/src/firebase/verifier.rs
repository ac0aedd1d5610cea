//! ID token verification and allow-list verdicts.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use shared::{AllowList, Verdict};
use thiserror::Error;

use super::app::{AdminApp, AdminRegistry};
use super::claims::FirebaseClaims;
use super::credential::ServiceAccountSettings;
use super::keys::{KeyError, KeySource};

const CLOCK_SKEW_SECS: i64 = 60;
const MAX_SUBJECT_LEN: usize = 128;

/// Errors returned to callers of [`TokenVerifier::verify`].
///
/// The underlying cause of an invalid token is logged, never returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Firebase Admin SDK not initialized")]
    NotConfigured,

    #[error("Invalid or expired token")]
    InvalidToken,
}

#[derive(Debug, Error)]
enum TokenRejection {
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("unexpected signing algorithm {0:?}")]
    Algorithm(Algorithm),

    #[error("token header has no key id")]
    MissingKid,

    #[error(transparent)]
    Keys(#[from] KeyError),

    #[error("subject must be a non-empty string of at most {MAX_SUBJECT_LEN} characters")]
    Subject,

    #[error("token was issued in the future")]
    IssuedInFuture,
}

pub fn issuer_for(project_id: &str) -> String {
    format!("https://securetoken.google.com/{project_id}")
}

/// Verifies provider ID tokens and decides whether their owner is allowed in.
pub struct TokenVerifier {
    registry: Arc<AdminRegistry>,
    settings: ServiceAccountSettings,
    keys: KeySource,
    allow_list: Arc<AllowList>,
}

impl TokenVerifier {
    pub fn new(
        registry: Arc<AdminRegistry>,
        settings: ServiceAccountSettings,
        keys: KeySource,
        allow_list: Arc<AllowList>,
    ) -> Self {
        Self {
            registry,
            settings,
            keys,
            allow_list,
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Admin app for this verifier, initializing it on first use.
    pub fn admin_app(&self) -> Option<Arc<AdminApp>> {
        self.registry.initialize(&self.settings)
    }

    /// Verify `token` and compute the allow-list verdict for its owner.
    pub async fn verify(&self, token: &str) -> Result<Verdict, VerifyError> {
        tracing::debug!("Starting token verification, token length: {}", token.len());

        let app = self.admin_app().ok_or_else(|| {
            tracing::error!("Firebase Admin SDK is not initialized - check configuration");
            VerifyError::NotConfigured
        })?;

        let claims = self.decode(&app, token).await.map_err(|cause| {
            tracing::warn!("Token verification failed: {}", cause);
            VerifyError::InvalidToken
        })?;

        let authorized = claims
            .email
            .as_deref()
            .is_some_and(|email| self.allow_list.is_authorized(email));

        tracing::info!(
            "Token verified - UID: {}, Email: {:?}, Authorized: {}",
            claims.sub,
            claims.email,
            authorized
        );

        Ok(Verdict {
            subject: claims.sub,
            email: claims.email,
            authorized,
        })
    }

    async fn decode(&self, app: &AdminApp, token: &str) -> Result<FirebaseClaims, TokenRejection> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(TokenRejection::Algorithm(header.alg));
        }
        let kid = header.kid.ok_or(TokenRejection::MissingKid)?;
        let key = self.keys.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = CLOCK_SKEW_SECS as u64;
        validation.set_audience(&[app.project_id()]);
        validation.set_issuer(&[issuer_for(app.project_id())]);
        validation.set_required_spec_claims(&["exp", "iat", "aud", "iss", "sub"]);

        let claims = decode::<FirebaseClaims>(token, &key, &validation)?.claims;

        if claims.sub.is_empty() || claims.sub.chars().count() > MAX_SUBJECT_LEN {
            return Err(TokenRejection::Subject);
        }

        let latest = Utc::now().timestamp() + CLOCK_SKEW_SECS;
        if claims.iat > latest || claims.auth_time.is_some_and(|t| t > latest) {
            return Err(TokenRejection::IssuedInFuture);
        }

        Ok(claims)
    }
}
