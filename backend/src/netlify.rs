//! Serverless function adapter.
//!
//! Translates a function invocation envelope into an HTTP request for the
//! axum router and the router's response back into a result envelope.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use shared::ErrorResponse;
use tower::ServiceExt;

/// Mount point of the function; requests below it are routed under `/api`.
pub const BASE_PATH: &str = "/.netlify/functions/api";

const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "video/",
    "application/octet-stream",
    "multipart/form-data",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEvent {
    pub http_method: String,
    pub path: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub multi_value_headers: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub query_string_parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub multi_value_headers: HashMap<String, Vec<String>>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl FunctionResponse {
    pub fn internal_error() -> Self {
        let body = serde_json::to_string(&ErrorResponse::new("Internal server error"))
            .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());
        Self {
            status_code: 500,
            headers: HashMap::from([(
                header::CONTENT_TYPE.to_string(),
                "application/json".to_string(),
            )]),
            multi_value_headers: HashMap::new(),
            body,
            is_base64_encoded: false,
        }
    }
}

/// Holds the router across invocations.
#[derive(Clone)]
pub struct FunctionHandler {
    router: Router,
}

impl FunctionHandler {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub async fn handle(&self, event: FunctionEvent) -> FunctionResponse {
        handle_event(&self.router, event).await
    }
}

/// Dispatch one invocation; adapter failures become a generic 500.
pub async fn handle_event(router: &Router, event: FunctionEvent) -> FunctionResponse {
    match dispatch(router, event).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Serverless function error: {:?}", e);
            FunctionResponse::internal_error()
        }
    }
}

async fn dispatch(router: &Router, event: FunctionEvent) -> Result<FunctionResponse> {
    let request = build_request(event)?;
    let response = router
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    build_response(response).await
}

/// Map a function path onto the router's `/api` prefix.
pub fn rewrite_path(path: &str) -> String {
    match path.strip_prefix(BASE_PATH) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => format!("/api{rest}"),
        _ => path.to_string(),
    }
}

fn build_uri(path: &str, query: Option<&BTreeMap<String, String>>) -> Result<String> {
    let mut url = Url::parse("http://localhost").context("Failed to build base URL")?;
    url.set_path(&rewrite_path(path));
    if let Some(params) = query.filter(|q| !q.is_empty()) {
        url.query_pairs_mut().extend_pairs(params.iter());
    }

    Ok(match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    })
}

fn build_request(event: FunctionEvent) -> Result<Request<Body>> {
    let method = Method::from_bytes(event.http_method.as_bytes())
        .with_context(|| format!("Invalid HTTP method {:?}", event.http_method))?;
    let uri = build_uri(&event.path, event.query_string_parameters.as_ref())?;

    let mut builder = Request::builder().method(method).uri(uri);

    match event.multi_value_headers.filter(|h| !h.is_empty()) {
        Some(multi) => {
            for (name, values) in multi {
                for value in values {
                    builder = builder.header(name.as_str(), value);
                }
            }
        }
        None => {
            for (name, value) in event.headers.unwrap_or_default() {
                builder = builder.header(name, value);
            }
        }
    }

    let body = match event.body {
        Some(body) if event.is_base64_encoded => STANDARD
            .decode(body.as_bytes())
            .context("Request body is not valid base64")?,
        Some(body) => body.into_bytes(),
        None => Vec::new(),
    };

    builder
        .body(Body::from(body))
        .context("Failed to build request")
}

async fn build_response(response: Response<Body>) -> Result<FunctionResponse> {
    let (parts, body) = response.into_parts();

    let mut headers = HashMap::new();
    let mut multi_value_headers: HashMap<String, Vec<String>> = HashMap::new();
    for name in parts.headers.keys() {
        let values: Vec<String> = parts
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        if let [single] = values.as_slice() {
            headers.insert(name.to_string(), single.clone());
        }
        multi_value_headers.insert(name.to_string(), values);
    }

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let bytes = body
        .collect()
        .await
        .context("Failed to read response body")?
        .to_bytes();

    let (body, is_base64_encoded) = if is_binary(content_type) {
        (STANDARD.encode(&bytes), true)
    } else {
        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => (text, false),
            Err(_) => (STANDARD.encode(&bytes), true),
        }
    };

    Ok(FunctionResponse {
        status_code: parts.status.as_u16(),
        headers,
        multi_value_headers,
        body,
        is_base64_encoded,
    })
}

pub fn is_binary(content_type: &str) -> bool {
    let content_type = content_type.trim().to_ascii_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| content_type.starts_with(prefix))
}
