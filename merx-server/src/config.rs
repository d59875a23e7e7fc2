use anyhow::Context;
use chrono::Duration;
use merx_core::{SmtpSettings, TokenPolicy};
use serde::Deserialize;

/// Token lifetime knobs, in the units operators actually think in.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSettings {
    pub access_minutes: i64,
    pub refresh_days: i64,
    pub email_confirm_hours: i64,
    pub password_reset_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl SmtpConfig {
    pub fn settings(&self) -> SmtpSettings {
        SmtpSettings {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            from: self.from.clone(),
        }
    }
}

/// Server configuration, layered defaults <- optional TOML file <-
/// `MERX`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub listen_addr: String,
    /// Public origin used when building confirmation and reset links.
    pub public_base_url: String,
    pub jwt_secret: String,
    #[serde(default)]
    pub database_url: Option<String>,
    pub tokens: TokenSettings,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    pub fn token_policy(&self) -> TokenPolicy {
        let mut policy = TokenPolicy::new(self.public_base_url.clone());
        policy.access_lifetime = Duration::minutes(self.tokens.access_minutes);
        policy.refresh_lifetime = Duration::days(self.tokens.refresh_days);
        policy.email_confirm_lifetime = Duration::hours(self.tokens.email_confirm_hours);
        policy.password_reset_lifetime =
            Duration::minutes(self.tokens.password_reset_minutes);
        policy
    }
}

/// Load configuration, optionally from an explicit file path.
pub fn load(path: Option<&str>) -> anyhow::Result<Config> {
    let mut builder = config::Config::builder()
        .set_default("listen_addr", "0.0.0.0:8080")?
        .set_default("public_base_url", "http://localhost:8080")?
        .set_default("jwt_secret", "")?
        .set_default("tokens.access_minutes", 15)?
        .set_default("tokens.refresh_days", 7)?
        .set_default("tokens.email_confirm_hours", 24)?
        .set_default("tokens.password_reset_minutes", 60)?;

    builder = match path {
        Some(path) => builder.add_source(config::File::with_name(path)),
        None => builder.add_source(config::File::with_name("merx").required(false)),
    };

    let settings = builder
        .add_source(config::Environment::with_prefix("MERX").separator("__"))
        .build()
        .context("failed to assemble configuration")?;

    let config: Config = settings
        .try_deserialize()
        .context("failed to deserialize configuration")?;

    if config.jwt_secret.is_empty() {
        anyhow::bail!("jwt_secret must be set (merx.toml or MERX_JWT_SECRET)");
    }

    Ok(config)
}
