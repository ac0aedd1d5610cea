//! Serverless function shim.
//!
//! Reads one invocation event per line of stdin and writes one response
//! envelope per line of stdout. The router is built once for the process.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backend::config::AppConfig;
use backend::netlify::{FunctionEvent, FunctionHandler, FunctionResponse};
use backend::{create_app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries responses
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let handler = FunctionHandler::new(create_app(
        AppState::from_config(&config),
        config.cors_allowed_origins.as_deref(),
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read event")? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<FunctionEvent>(&line) {
            Ok(event) => handler.handle(event).await,
            Err(e) => {
                tracing::error!("Malformed function event: {}", e);
                FunctionResponse::internal_error()
            }
        };

        let mut out = serde_json::to_vec(&response).context("Failed to encode response")?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    Ok(())
}
