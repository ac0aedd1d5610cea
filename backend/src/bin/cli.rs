use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use backend::config::AppConfig;
use backend::firebase::{
    AdminRegistry, KeySource, ServiceAccountCredential, TokenVerifier, VerifyError,
};
use shared::AllowList;

#[derive(Parser)]
#[command(name = "admin-cli")]
#[command(about = "Operator tools for the admin panel authentication backend")]
#[command(
    long_about = "Inspect and exercise the admin panel's authentication configuration.\n\n\
    Reads the same environment (and .env file) as the backend server, so the answers\n\
    match what the running service would decide."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether an email address is on the allow-list
    CheckEmail {
        /// Email address to check
        email: String,

        /// Comma-separated allow-list; entries starting with `@` match a whole domain
        #[arg(long, env = "AUTHORIZED_EMAILS", default_value = "")]
        authorized_emails: String,
    },

    /// Verify an ID token and print the allow-list verdict as JSON
    VerifyToken {
        /// The ID token to verify
        token: String,
    },

    /// Mint a custom token for a uid with the service account key
    MintToken {
        /// User id to embed in the token
        uid: String,

        /// Extra developer claims as a JSON object
        #[arg(long)]
        claims: Option<String>,
    },

    /// Report which service account values are present and whether they load
    CredentialStatus,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckEmail {
            email,
            authorized_emails,
        } => {
            let allow_list = AllowList::parse(&authorized_emails);
            let authorized = allow_list.is_authorized(&email);
            println!(
                "{} is {}authorized ({} allow-list entries)",
                email,
                if authorized { "" } else { "not " },
                allow_list.len()
            );
            if !authorized {
                std::process::exit(1);
            }
        }

        Commands::VerifyToken { token } => {
            let config = AppConfig::from_env()?;
            let verifier = TokenVerifier::new(
                Arc::new(AdminRegistry::new()),
                config.service_account.clone(),
                KeySource::remote(config.jwks_url.clone()),
                Arc::new(config.allow_list.clone()),
            );

            match verifier.verify(token.trim()).await {
                Ok(verdict) => println!("{}", serde_json::to_string_pretty(&verdict)?),
                Err(VerifyError::NotConfigured) => {
                    bail!("Service account is not configured; run credential-status")
                }
                Err(e) => bail!("{}", e),
            }
        }

        Commands::MintToken { uid, claims } => {
            let config = AppConfig::from_env()?;
            let claims = claims
                .map(|raw| {
                    serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&raw)
                        .context("--claims must be a JSON object")
                })
                .transpose()?;

            let registry = AdminRegistry::new();
            let app = registry
                .initialize(&config.service_account)
                .context("Service account is not configured; run credential-status")?;
            println!("{}", app.create_custom_token(&uid, claims)?);
        }

        Commands::CredentialStatus => {
            let config = AppConfig::from_env()?;
            let settings = &config.service_account;
            let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

            println!("Project ID:    {}", present(&settings.project_id));
            println!("Client email:  {}", present(&settings.client_email));
            println!("Private key:   {}", present(&settings.private_key));
            println!("Allow-list:    {} entries", config.allow_list.len());

            match ServiceAccountCredential::from_settings(settings) {
                Ok(credential) => {
                    println!("Credential:    ok ({})", credential.client_email);
                    if AdminRegistry::new().initialize(settings).is_none() {
                        bail!("Private key could not be parsed as an RSA key");
                    }
                }
                Err(e) => bail!("{}", e),
            }
        }
    }

    Ok(())
}
