//! Unified error handling for the backend API.
//!
//! Handlers return `ApiResult<T>` and use `?`; each variant maps to a status
//! code and a stable JSON message. Internal causes are logged here and never
//! echoed, except processing details in development mode.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::ErrorResponse;
use thiserror::Error;

use crate::config::DeployMode;
use crate::firebase::VerifyError;
use crate::media::MediaError;

/// Unified error type for API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Authentication required but not provided or invalid
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A required external subsystem is not configured
    #[error("Configuration error: {0}")]
    NotConfigured(String),

    /// Transcoding failed before any output was produced
    #[error("Processing error: {cause}")]
    Processing {
        cause: String,
        expose_details: bool,
    },

    /// Anything else
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// Map a relay failure, echoing its cause only in development mode.
    pub fn from_media(err: MediaError, mode: DeployMode) -> Self {
        match err {
            MediaError::InvalidInput(reason) => {
                tracing::info!("Rejected video URL: {}", reason);
                ApiError::BadRequest("Invalid video URL".to_string())
            }
            MediaError::Processing(cause) => ApiError::Processing {
                cause,
                expose_details: mode.exposes_error_details(),
            },
        }
    }
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::NotConfigured => ApiError::NotConfigured(err.to_string()),
            VerifyError::InvalidToken => ApiError::Unauthorized(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorResponse::new(msg)),
            ApiError::NotConfigured(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new("Authentication service is not configured"),
                )
            }
            ApiError::Processing {
                cause,
                expose_details,
            } => {
                tracing::error!("Video processing failed: {}", cause);
                let body = if expose_details {
                    ErrorResponse::with_details("Video processing failed", cause)
                } else {
                    ErrorResponse::new("Video processing failed")
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
