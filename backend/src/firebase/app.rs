//! Admin app handle and its process-wide registry.

use std::sync::{Arc, OnceLock};

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use parking_lot::RwLock;
use thiserror::Error;

use super::claims::CustomTokenClaims;
use super::credential::{CredentialError, ServiceAccountCredential, ServiceAccountSettings};

pub const CUSTOM_TOKEN_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

const CUSTOM_TOKEN_LIFETIME_SECS: i64 = 60 * 60;
const MAX_UID_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Service account private key could not be parsed")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid uid: {0}")]
    InvalidUid(String),

    #[error("Failed to sign custom token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Initialized admin app, built from a validated service account.
pub struct AdminApp {
    credential: ServiceAccountCredential,
    signing_key: EncodingKey,
}

impl std::fmt::Debug for AdminApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminApp")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl AdminApp {
    pub fn new(credential: ServiceAccountCredential) -> Result<Self, AdminError> {
        let signing_key = EncodingKey::from_rsa_pem(credential.private_key().as_bytes())
            .map_err(AdminError::InvalidKey)?;

        Ok(Self {
            credential,
            signing_key,
        })
    }

    pub fn from_settings(settings: &ServiceAccountSettings) -> Result<Self, AdminError> {
        Self::new(ServiceAccountCredential::from_settings(settings)?)
    }

    pub fn project_id(&self) -> &str {
        &self.credential.project_id
    }

    pub fn client_email(&self) -> &str {
        &self.credential.client_email
    }

    /// Mint a custom token the client can exchange for a session.
    pub fn create_custom_token(
        &self,
        uid: &str,
        developer_claims: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<String, AdminError> {
        if uid.is_empty() || uid.chars().count() > MAX_UID_LEN {
            return Err(AdminError::InvalidUid(format!(
                "uid must be a non-empty string of at most {MAX_UID_LEN} characters"
            )));
        }

        let now = Utc::now();
        let claims = CustomTokenClaims {
            iss: self.credential.client_email.clone(),
            sub: self.credential.client_email.clone(),
            aud: CUSTOM_TOKEN_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(CUSTOM_TOKEN_LIFETIME_SECS)).timestamp(),
            uid: uid.to_string(),
            claims: developer_claims.filter(|c| !c.is_empty()),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(AdminError::Signing)
    }
}

/// Holder for the single admin app of a process.
///
/// Initialization is lazy and idempotent: the first successful call builds
/// the app and every later call returns the same handle. Failures are not
/// remembered, so a later call retries.
#[derive(Debug, Default)]
pub struct AdminRegistry {
    app: RwLock<Option<Arc<AdminApp>>>,
}

impl AdminRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry shared by the whole process.
    pub fn global() -> Arc<AdminRegistry> {
        static GLOBAL: OnceLock<Arc<AdminRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(AdminRegistry::new())).clone()
    }

    pub fn get(&self) -> Option<Arc<AdminApp>> {
        self.app.read().clone()
    }

    /// Return the existing app or build one from `settings`.
    ///
    /// Returns `None` (after logging why) when the credential is unusable.
    pub fn initialize(&self, settings: &ServiceAccountSettings) -> Option<Arc<AdminApp>> {
        if let Some(app) = self.get() {
            return Some(app);
        }

        let mut slot = self.app.write();
        if let Some(app) = slot.as_ref() {
            return Some(app.clone());
        }

        match AdminApp::from_settings(settings) {
            Ok(app) => {
                tracing::info!(
                    "Firebase Admin SDK initialized for project: {}",
                    app.project_id()
                );
                let app = Arc::new(app);
                *slot = Some(app.clone());
                Some(app)
            }
            Err(e) => {
                tracing::error!("Failed to initialize Firebase Admin SDK: {}", e);
                None
            }
        }
    }

    /// Drop the current app so the next call re-initializes.
    pub fn reset(&self) {
        *self.app.write() = None;
    }
}
