use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{auth, health, media};
use crate::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Auth routes
        .route("/auth/verify", post(auth::verify_token))

        // Media routes
        .route("/watermark-video", post(media::watermark_video))
}
