use serde::{Deserialize, Serialize};

// ============================================================================
// Auth API Types
// ============================================================================

/// Body accepted by `POST /api/auth/verify` when no bearer header is sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyTokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// Outcome of checking a verified identity against the allow-list.
///
/// An unauthorized verdict is ordinary data, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub subject: String,
    pub email: Option<String>,
    pub authorized: bool,
}

// ============================================================================
// Media API Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkRequest {
    #[serde(rename = "videoUrl")]
    pub video_url: String,
}

// ============================================================================
// Misc
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}
