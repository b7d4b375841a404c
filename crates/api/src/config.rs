//! API server configuration.

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub provider_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:7000".to_string()),
            provider_url: std::env::var("PAYMENT_PROVIDER_URL")
                .context("PAYMENT_PROVIDER_URL must be set")?,
        })
    }
}
