//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

use crate::classifier::GeminiConfig;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Classification model settings.
    pub gemini: GeminiConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `API_ADDR` | Server bind address | `127.0.0.1:3000` |
    /// | `DATABASE_URL` | SQLite database URL | `sqlite:credit_gate.db?mode=rwc` |
    /// | `GEMINI_API_KEY` | Model API key | (required) |
    /// | `GEMINI_MODEL` | Model name | `gemini-2.0-flash` |
    /// | `GEMINI_API_URL` | API base URL | `https://generativelanguage.googleapis.com` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("API_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:credit_gate.db?mode=rwc".to_string());

        let gemini = GeminiConfig::from_env()?;

        Ok(Self {
            addr,
            database_url,
            gemini,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid API_ADDR format")]
    InvalidAddr,

    #[error("GEMINI_API_KEY environment variable is required")]
    MissingApiKey,
}
