use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use shared::{Verdict, VerifyTokenRequest};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Verify an ID token and report whether its owner is on the allow-list.
///
/// The bearer header takes precedence over a `{ "token": ... }` body.
pub async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Verdict>> {
    let token = extract_token_from_header(&headers)
        .or_else(|| extract_token_from_body(&body))
        .ok_or_else(|| ApiError::bad_request("Token is required"))?;

    let verdict = state.verifier.verify(&token).await?;
    Ok(Json(verdict))
}

fn extract_token_from_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|s| s.to_string())
}

fn extract_token_from_body(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice::<VerifyTokenRequest>(body)
        .ok()?
        .token
        .filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_token_from_header(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_token_from_header(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_token_from_header(&headers), None);
    }

    #[test]
    fn test_body_token() {
        assert_eq!(
            extract_token_from_body(br#"{"token":"abc"}"#).as_deref(),
            Some("abc")
        );
        assert_eq!(extract_token_from_body(b""), None);
        assert_eq!(extract_token_from_body(b"{}"), None);
        assert_eq!(extract_token_from_body(br#"{"token":"  "}"#), None);
        assert_eq!(extract_token_from_body(b"not json"), None);
    }
}
