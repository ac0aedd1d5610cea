//! API Endpoint Tests
//!
//! Tests for:
//! - Health endpoint
//! - Token verification and allow-list verdicts
//! - Video watermarking responses

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use backend::config::DeployMode;
use backend::firebase::ServiceAccountSettings;
use common::{build_app, build_app_with_cors, default_app, service_account, sign_token, token_for, FakeTranscoder};

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = default_app();
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({ "status": "ok" }));
}

// ============================================================================
// Token verification
// ============================================================================

#[tokio::test]
async fn test_verify_domain_wildcard_is_authorized() {
    let app = default_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/verify")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for("alice@acme.com")))
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({ "subject": "uid-123", "email": "alice@acme.com", "authorized": true })
    );
}

#[tokio::test]
async fn test_verify_unlisted_email_is_200_not_authorized() {
    let app = default_app();
    let request = post_json("/api/auth/verify", json!({ "token": token_for("bob@acme.org") }));

    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["authorized"], false);
    assert_eq!(body["email"], "bob@acme.org");
}

#[tokio::test]
async fn test_verify_header_wins_over_body() {
    let app = default_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/verify")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for("bob@other.com")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "token": "garbage" }).to_string()))
        .unwrap();

    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["authorized"], true);
}

#[tokio::test]
async fn test_verify_invalid_tokens_are_401() {
    let app = default_app();
    for token in [
        "not-a-jwt".to_string(),
        sign_token(common::FOREIGN_KEY, Some("alice@acme.com"), common::PROJECT),
        sign_token(common::SIGNING_KEY, Some("alice@acme.com"), "other-project"),
    ] {
        let (status, _, body) =
            send(&app.router, post_json("/api/auth/verify", json!({ "token": token }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(&body), json!({ "error": "Invalid or expired token" }));
    }
}

#[tokio::test]
async fn test_verify_without_token_is_400() {
    let app = default_app();
    let (status, _, body) = send(&app.router, post_json("/api/auth/verify", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"].is_string());
}

#[tokio::test]
async fn test_verify_without_credentials_is_503() {
    let app = build_app(
        ServiceAccountSettings::default(),
        FakeTranscoder::new(vec![]),
        DeployMode::Production,
    );
    let request = post_json("/api/auth/verify", json!({ "token": token_for("alice@acme.com") }));

    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(&body);
    assert!(body.get("details").is_none());
    assert!(!body["error"].as_str().unwrap().contains("PRIVATE KEY"));
}

// ============================================================================
// Watermarking
// ============================================================================

#[tokio::test]
async fn test_watermark_streams_mp4_attachment() {
    let app = default_app();
    let request = post_json(
        "/api/watermark-video",
        json!({ "videoUrl": "https://cdn.example.com/clips/a.mp4" }),
    );

    let (status, headers, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"video-watermarked.mp4\""
    );
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(body, b"ftypmoov");
    assert_eq!(
        *app.transcoder.sources.lock(),
        vec!["https://cdn.example.com/clips/a.mp4".to_string()]
    );
}

#[tokio::test]
async fn test_watermark_rejects_bad_urls_without_spawning() {
    let app = default_app();
    for url in ["not a url", "file:///etc/passwd", "http://127.0.0.1/a.mp4"] {
        let (status, _, body) =
            send(&app.router, post_json("/api/watermark-video", json!({ "videoUrl": url }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{url}");
        assert_eq!(json_body(&body), json!({ "error": "Invalid video URL" }));
    }
    assert_eq!(app.transcoder.call_count(), 0);
}

#[tokio::test]
async fn test_watermark_requires_video_url() {
    let app = default_app();
    for body in [json!({}), json!({ "videoUrl": "" }), json!({ "videoUrl": 7 })] {
        let (status, _, body) = send(&app.router, post_json("/api/watermark-video", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body), json!({ "error": "Video URL is required" }));
    }
    assert_eq!(app.transcoder.call_count(), 0);
}

#[tokio::test]
async fn test_watermark_failure_hides_details_in_production() {
    let app = build_app(
        service_account(),
        FakeTranscoder::new(vec![Err("Server returned 404 Not Found")]),
        DeployMode::Production,
    );
    let request = post_json(
        "/api/watermark-video",
        json!({ "videoUrl": "https://cdn.example.com/missing.mp4" }),
    );

    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(&body), json!({ "error": "Video processing failed" }));
}

#[tokio::test]
async fn test_watermark_failure_shows_details_in_development() {
    let app = build_app(
        service_account(),
        FakeTranscoder::new(vec![Err("Server returned 404 Not Found")]),
        DeployMode::Development,
    );
    let request = post_json(
        "/api/watermark-video",
        json!({ "videoUrl": "https://cdn.example.com/missing.mp4" }),
    );

    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(&body);
    assert_eq!(body["error"], "Video processing failed");
    assert!(body["details"].as_str().unwrap().contains("404"));
}

// ============================================================================
// CORS
// ============================================================================

#[tokio::test]
async fn test_cors_only_echoes_configured_origins() {
    let app = build_app_with_cors(
        service_account(),
        FakeTranscoder::new(vec![]),
        DeployMode::Production,
        Some("https://admin.example.com, not\na-header"),
    );
    let health_from = |origin: &str| {
        Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap()
    };

    let (status, headers, _) = send(&app.router, health_from("https://admin.example.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://admin.example.com"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

    let (_, headers, _) = send(&app.router, health_from("https://evil.example.com")).await;
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn test_cors_is_permissive_without_configuration() {
    let app = default_app();
    let request = Request::builder()
        .uri("/api/health")
        .header(header::ORIGIN, "https://anywhere.example.com")
        .body(Body::empty())
        .unwrap();

    let (_, headers, _) = send(&app.router, request).await;
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = default_app();
    let request = Request::builder()
        .uri("/api/nope")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
