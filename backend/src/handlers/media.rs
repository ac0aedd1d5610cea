use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use shared::WatermarkRequest;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const OUTPUT_FILENAME: &str = "video-watermarked.mp4";

/// Stream a watermarked MP4 copy of `videoUrl` back to the caller.
pub async fn watermark_video(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let video_url = extract_video_url(&body)
        .ok_or_else(|| ApiError::bad_request("Video URL is required"))?;

    tracing::info!("Processing video: {}", video_url);

    let stream = state
        .relay
        .watermark(&video_url)
        .await
        .map_err(|e| ApiError::from_media(e, state.mode))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{OUTPUT_FILENAME}\""),
            ),
            (
                header::CACHE_CONTROL,
                "no-cache, no-store, must-revalidate".to_string(),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// `videoUrl` must be a non-empty string.
fn extract_video_url(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<WatermarkRequest>(body)
        .ok()
        .map(|req| req.video_url)
        .filter(|url| !url.trim().is_empty())
}
