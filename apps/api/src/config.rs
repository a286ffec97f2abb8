use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Panics at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub identity_provider_url: String,
    pub identity_service_key: String,
    pub completion_webhook_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Per-target budget for best-effort propagation, in seconds.
    pub propagation_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            identity_provider_url: require_env("IDENTITY_PROVIDER_URL")?,
            identity_service_key: require_env("IDENTITY_SERVICE_ROLE_KEY")?,
            completion_webhook_url: require_env("PROFILE_COMPLETED_WEBHOOK_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            propagation_timeout_secs: std::env::var("PROPAGATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u64>()
                .context("PROPAGATION_TIMEOUT_SECS must be a number of seconds")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
