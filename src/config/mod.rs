//! Configuration module for the storefront code service.
//!
//! Configuration is loaded from environment variables (optionally seeded
//! from a `.env` file by the binaries through `dotenvy`).

mod database_config;

pub use database_config::DatabaseEnvConfig;

use anyhow::Result;

/// Main application configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database: DatabaseEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database: DatabaseEnvConfig::from_env()?,
        })
    }
}
