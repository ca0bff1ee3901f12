//! Database configuration parsing from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Database environment configuration
#[derive(Debug, Clone)]
pub struct DatabaseEnvConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for DatabaseEnvConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://storefront.db".to_string(),
            max_connections: 5,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

impl DatabaseEnvConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let url = env::var("DATABASE_URL").unwrap_or(defaults.url);
        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse::<u32>()
                .context("Failed to parse DATABASE_MAX_CONNECTIONS")?,
            Err(_) => defaults.max_connections,
        };
        if max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        let busy_timeout = match env::var("DATABASE_BUSY_TIMEOUT_MS") {
            Ok(raw) => Duration::from_millis(
                raw.parse::<u64>()
                    .context("Failed to parse DATABASE_BUSY_TIMEOUT_MS")?,
            ),
            Err(_) => defaults.busy_timeout,
        };

        Ok(Self {
            url,
            max_connections,
            busy_timeout,
        })
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}
