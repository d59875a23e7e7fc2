//! # Merx Server
//!
//! Identity layer of the Merx e-commerce backend.
//!
//! ## Overview
//!
//! The server exposes the credential and token lifecycle over HTTP:
//!
//! - **Login / refresh**: short-lived signed access tokens with
//!   rotating refresh tokens carried in an HttpOnly cookie
//! - **Registration**: email-confirmation links with time-boxed tokens
//! - **Password recovery**: forgot/reset/change flows with single-use
//!   reset tokens delivered over SMTP
//!
//! ## Architecture
//!
//! The binary wires the `merx-core` workflows to:
//! - PostgreSQL for the credential store (in-memory fallback for
//!   storeless development runs)
//! - an SMTP relay for outbound mail (no-op fallback)

use std::sync::Arc;

use anyhow::Context;
use merx_core::{
    AuthService, CredentialStore, Mailer, MemoryCredentialStore, NoopMailer,
    PgCredentialStore, SmtpMailer, TokenIssuer,
    store::postgres::MIGRATOR,
};
use merx_server::{config, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var("MERX_CONFIG").ok();
    let config = config::load(config_path.as_deref())?;

    let store: Arc<dyn CredentialStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(8)
                .connect(url)
                .await
                .context("failed to connect to the credential database")?;
            MIGRATOR
                .run(&pool)
                .await
                .context("failed to run credential store migrations")?;
            tracing::info!("credential store: postgres");
            Arc::new(PgCredentialStore::new(pool))
        }
        None => {
            tracing::warn!(
                "no database_url configured; using the in-memory credential store"
            );
            Arc::new(MemoryCredentialStore::new())
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, "mail transport: smtp relay");
            Arc::new(SmtpMailer::new(&smtp.settings())?)
        }
        None => {
            tracing::warn!("no smtp configured; reset emails will be dropped");
            Arc::new(NoopMailer)
        }
    };

    let issuer = TokenIssuer::new(config.token_policy(), config.jwt_secret.as_bytes());
    let state = AppState {
        auth: Arc::new(AuthService::new(store, mailer, issuer)),
    };

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "merx identity service listening");

    axum::serve(listener, routes::router(state))
        .await
        .context("server terminated")?;

    Ok(())
}
