pub mod config;
pub mod error;
pub mod firebase;
mod handlers;
pub mod media;
pub mod netlify;
mod routes;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, DeployMode};
use crate::firebase::{AdminRegistry, KeySource, TokenVerifier};
use crate::media::{FfmpegTranscoder, MediaRelay};
use crate::routes::api_routes;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<TokenVerifier>,
    pub relay: Arc<MediaRelay>,
    pub mode: DeployMode,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        let verifier = TokenVerifier::new(
            AdminRegistry::global(),
            config.service_account.clone(),
            KeySource::remote(config.jwks_url.clone()),
            Arc::new(config.allow_list.clone()),
        );
        let relay = MediaRelay::new(
            Arc::new(FfmpegTranscoder::new(config.media.ffmpeg_path.clone())),
            config.media.allow_private_hosts,
        );

        Self {
            verifier: Arc::new(verifier),
            relay: Arc::new(relay),
            mode: config.mode,
        }
    }
}

/// Build the full application router.
pub fn create_app(state: AppState, cors_allowed_origins: Option<&str>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_allowed_origins))
        .with_state(state)
}

/// CORS for the API: restricted to `allowed_origins` (comma-separated) when
/// any of them parse, otherwise any origin is allowed.
pub fn build_cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let origins = allowed_origins.map(parse_origins).unwrap_or_default();

    if origins.is_empty() {
        tracing::warn!(
            configured = allowed_origins.is_some(),
            "No usable CORS origins, allowing any origin"
        );
        return CorsLayer::permissive();
    }

    tracing::info!("CORS restricted to {} origin(s): {:?}", origins.len(), origins);
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect()
}
