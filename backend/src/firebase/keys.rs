//! Provider signing keys (JWKS), fetched over HTTPS and cached per the
//! endpoint's `Cache-Control: max-age`.

use std::time::{Duration, Instant};

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use parking_lot::RwLock;
use reqwest::header::CACHE_CONTROL;
use thiserror::Error;

pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Failed to fetch signing keys: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Signing key endpoint returned status {0}")]
    Status(u16),

    #[error("No signing key with id {0}")]
    UnknownKid(String),

    #[error("Signing key could not be used: {0}")]
    InvalidJwk(#[source] jsonwebtoken::errors::Error),
}

struct CachedKeys {
    set: JwkSet,
    expires_at: Instant,
}

/// JWKS endpoint with its cached response.
pub struct RemoteKeys {
    http: reqwest::Client,
    url: String,
    cache: RwLock<Option<CachedKeys>>,
}

impl RemoteKeys {
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, KeyError> {
        {
            let cached = self.cache.read();
            if let Some(keys) = cached.as_ref().filter(|k| k.expires_at > Instant::now()) {
                return key_from_set(&keys.set, kid);
            }
        }

        let fetched = fetch(&self.http, &self.url).await?;
        let key = key_from_set(&fetched.set, kid);
        *self.cache.write() = Some(fetched);
        key
    }
}

/// Where ID token signing keys come from.
pub enum KeySource {
    Remote(RemoteKeys),
    Fixed(JwkSet),
}

impl KeySource {
    pub fn remote(url: impl Into<String>) -> Self {
        KeySource::Remote(RemoteKeys {
            http: reqwest::Client::new(),
            url: url.into(),
            cache: RwLock::new(None),
        })
    }

    /// Static key set, used by tests and offline tooling.
    pub fn fixed(set: JwkSet) -> Self {
        KeySource::Fixed(set)
    }

    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, KeyError> {
        match self {
            KeySource::Fixed(set) => key_from_set(set, kid),
            KeySource::Remote(remote) => remote.decoding_key(kid).await,
        }
    }
}

fn key_from_set(set: &JwkSet, kid: &str) -> Result<DecodingKey, KeyError> {
    let jwk = set
        .find(kid)
        .ok_or_else(|| KeyError::UnknownKid(kid.to_string()))?;
    DecodingKey::from_jwk(jwk).map_err(KeyError::InvalidJwk)
}

async fn fetch(http: &reqwest::Client, url: &str) -> Result<CachedKeys, KeyError> {
    tracing::debug!("Fetching signing keys from {}", url);

    let response = http.get(url).send().await?;
    if !response.status().is_success() {
        return Err(KeyError::Status(response.status().as_u16()));
    }

    let max_age = response
        .headers()
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_max_age)
        .unwrap_or(DEFAULT_MAX_AGE);

    let set: JwkSet = response.json().await?;
    Ok(CachedKeys {
        set,
        expires_at: Instant::now() + max_age,
    })
}

fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const JWKS: &str = include_str!("../../testdata/jwks.json");

    #[test]
    fn test_parse_max_age() {
        assert_eq!(
            parse_max_age("public, max-age=19204, must-revalidate, no-transform"),
            Some(Duration::from_secs(19204))
        );
        assert_eq!(parse_max_age("no-cache"), None);
    }

    #[tokio::test]
    async fn test_fixed_source_finds_key_by_id() {
        let source = KeySource::fixed(serde_json::from_str(JWKS).unwrap());
        assert!(source.decoding_key("test-key-1").await.is_ok());
        assert!(matches!(
            source.decoding_key("other").await,
            Err(KeyError::UnknownKid(_))
        ));
    }

    #[tokio::test]
    async fn test_remote_keys_are_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("cache-control", "public, max-age=600")
                    .set_body_raw(JWKS, "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let source = KeySource::remote(format!("{}/jwks", server.uri()));
        assert!(source.decoding_key("test-key-1").await.is_ok());
        assert!(source.decoding_key("test-key-1").await.is_ok());
        assert!(matches!(
            source.decoding_key("unknown").await,
            Err(KeyError::UnknownKid(_))
        ));
    }

    #[tokio::test]
    async fn test_remote_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = KeySource::remote(format!("{}/jwks", server.uri()));
        assert!(matches!(
            source.decoding_key("test-key-1").await,
            Err(KeyError::Status(503))
        ));
    }
}
