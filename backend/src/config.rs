use anyhow::{Context, Result};
use shared::AllowList;
use std::env;

use crate::firebase::{ServiceAccountSettings, DEFAULT_JWKS_URL};

/// Whether internal error details may be echoed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    Development,
    Production,
}

impl DeployMode {
    /// Only an explicit `development` value enables detailed errors.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("development") {
            DeployMode::Development
        } else {
            DeployMode::Production
        }
    }

    pub fn from_env() -> Self {
        Self::parse(&env::var("RUST_ENV").unwrap_or_default())
    }

    pub fn exposes_error_details(self) -> bool {
        self == DeployMode::Development
    }
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Transcoder binary, `ffmpeg` on `PATH` unless `FFMPEG_PATH` is set
    pub ffmpeg_path: String,
    pub allow_private_hosts: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub mode: DeployMode,
    pub allow_list: AllowList,
    pub service_account: ServiceAccountSettings,
    pub jwks_url: String,
    pub media: MediaConfig,
    pub cors_allowed_origins: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            mode: DeployMode::from_env(),
            allow_list: AllowList::from_env("AUTHORIZED_EMAILS"),
            service_account: ServiceAccountSettings::from_env(),
            jwks_url: env::var("FIREBASE_JWKS_URL")
                .unwrap_or_else(|_| DEFAULT_JWKS_URL.to_string()),
            media: MediaConfig {
                ffmpeg_path: env::var("FFMPEG_PATH")
                    .ok()
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| "ffmpeg".to_string()),
                allow_private_hosts: parse_flag(
                    "WATERMARK_ALLOW_PRIVATE_HOSTS",
                    env::var("WATERMARK_ALLOW_PRIVATE_HOSTS").ok(),
                )?,
            },
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok(),
        })
    }
}

fn parse_flag(name: &str, raw: Option<String>) -> Result<bool> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(v) => anyhow::bail!("{name} must be true or false, got {v:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_mode_defaults_to_production() {
        assert_eq!(DeployMode::parse(""), DeployMode::Production);
        assert_eq!(DeployMode::parse("staging"), DeployMode::Production);
        assert_eq!(DeployMode::parse("Development"), DeployMode::Development);
        assert!(!DeployMode::Production.exposes_error_details());
        assert!(DeployMode::Development.exposes_error_details());
    }

    #[test]
    fn test_parse_flag() {
        assert!(!parse_flag("X", None).unwrap());
        assert!(parse_flag("X", Some("TRUE".into())).unwrap());
        assert!(parse_flag("X", Some("1".into())).unwrap());
        assert!(!parse_flag("X", Some(" false ".into())).unwrap());
        assert!(parse_flag("X", Some("maybe".into())).is_err());
    }
}
