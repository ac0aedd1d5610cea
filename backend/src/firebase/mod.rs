//! Server-side Firebase authentication.
//!
//! This module provides:
//! - service account credential loading and private key normalization
//! - `AdminRegistry`, the process-wide, init-once admin app handle
//! - ID token verification against the provider's published signing keys
//! - allow-list verdicts for verified tokens
//! - custom token minting with the service account key

mod app;
mod claims;
mod credential;
mod keys;
mod verifier;

pub use app::{AdminApp, AdminError, AdminRegistry, CUSTOM_TOKEN_AUDIENCE};
pub use claims::{CustomTokenClaims, FirebaseClaims, FirebaseInfo};
pub use credential::{
    normalize_private_key, CredentialError, ServiceAccountCredential, ServiceAccountSettings,
};
pub use keys::{KeyError, KeySource, RemoteKeys, DEFAULT_JWKS_URL};
pub use verifier::{issuer_for, TokenVerifier, VerifyError};
