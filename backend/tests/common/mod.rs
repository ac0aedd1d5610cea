//! Shared fixtures for router tests.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;

use axum::Router;
use bytes::Bytes;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use reqwest::Url;
use serde_json::json;

use backend::config::DeployMode;
use backend::firebase::{issuer_for, AdminRegistry, KeySource, ServiceAccountSettings, TokenVerifier};
use backend::media::{ByteStream, MediaError, MediaRelay, Transcoder};
use backend::{create_app, AppState};
use shared::AllowList;

pub const SIGNING_KEY: &str = include_str!("../../testdata/signing_key.pem");
pub const FOREIGN_KEY: &str = include_str!("../../testdata/foreign_key.pem");
pub const JWKS: &str = include_str!("../../testdata/jwks.json");
pub const PROJECT: &str = "admin-panel";
pub const ALLOW_LIST: &str = "@acme.com,bob@other.com";

/// Transcoder that records requested sources and replays canned output
pub struct FakeTranscoder {
    pub sources: Mutex<Vec<String>>,
    output: Vec<Result<&'static str, &'static str>>,
}

impl FakeTranscoder {
    pub fn new(output: Vec<Result<&'static str, &'static str>>) -> Self {
        Self {
            sources: Mutex::new(Vec::new()),
            output,
        }
    }

    pub fn call_count(&self) -> usize {
        self.sources.lock().len()
    }
}

impl Transcoder for FakeTranscoder {
    fn transcode(&self, source: &Url) -> Result<ByteStream, MediaError> {
        self.sources.lock().push(source.to_string());
        let items: Vec<io::Result<Bytes>> = self
            .output
            .iter()
            .map(|item| match item {
                Ok(chunk) => Ok(Bytes::from_static(chunk.as_bytes())),
                Err(msg) => Err(io::Error::new(io::ErrorKind::Other, msg.to_string())),
            })
            .collect();
        Ok(stream::iter(items).boxed())
    }
}

pub struct TestApp {
    pub router: Router,
    pub transcoder: Arc<FakeTranscoder>,
}

pub fn service_account() -> ServiceAccountSettings {
    ServiceAccountSettings {
        project_id: Some(PROJECT.into()),
        client_email: Some("firebase-adminsdk@admin-panel.iam.gserviceaccount.com".into()),
        private_key: Some(SIGNING_KEY.into()),
    }
}

pub fn build_app(
    settings: ServiceAccountSettings,
    transcoder: FakeTranscoder,
    mode: DeployMode,
) -> TestApp {
    build_app_with_cors(settings, transcoder, mode, None)
}

pub fn build_app_with_cors(
    settings: ServiceAccountSettings,
    transcoder: FakeTranscoder,
    mode: DeployMode,
    cors_allowed_origins: Option<&str>,
) -> TestApp {
    let transcoder = Arc::new(transcoder);
    let verifier = TokenVerifier::new(
        Arc::new(AdminRegistry::new()),
        settings,
        KeySource::fixed(serde_json::from_str(JWKS).expect("valid jwks fixture")),
        Arc::new(AllowList::parse(ALLOW_LIST)),
    );
    let state = AppState {
        verifier: Arc::new(verifier),
        relay: Arc::new(MediaRelay::new(transcoder.clone(), false)),
        mode,
    };

    TestApp {
        router: create_app(state, cors_allowed_origins),
        transcoder,
    }
}

pub fn default_app() -> TestApp {
    build_app(
        service_account(),
        FakeTranscoder::new(vec![Ok("ftyp"), Ok("moov")]),
        DeployMode::Production,
    )
}

pub fn sign_token(key_pem: &str, email: Option<&str>, audience: &str) -> String {
    let now = Utc::now().timestamp();
    let mut claims = json!({
        "iss": issuer_for(audience),
        "aud": audience,
        "sub": "uid-123",
        "iat": now - 10,
        "exp": now + 3600,
        "auth_time": now - 10,
    });
    if let Some(email) = email {
        claims["email"] = json!(email);
    }

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some("test-key-1".into());
    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(key_pem.as_bytes()).expect("valid pem fixture"),
    )
    .expect("token signs")
}

pub fn token_for(email: &str) -> String {
    sign_token(SIGNING_KEY, Some(email), PROJECT)
}
