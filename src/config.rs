//! Application configuration loaded from environment variables.

use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Top-level configuration for the server binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub data_dir: std::path::PathBuf,
    pub origin_base_url: String,
    pub discovery_endpoint_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unlike `SchedulerConfig::from_env`, failures here are fatal — a
    /// missing `DATABASE_URL` means the process cannot do anything useful.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            data_dir: env::var("LEI_SYNC_DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),
            origin_base_url: env::var("LEI_SYNC_ORIGIN_BASE_URL")
                .unwrap_or_else(|_| "https://goldencopy.gleif.org".to_string()),
            discovery_endpoint_url: env::var("LEI_SYNC_DISCOVERY_ENDPOINT_URL").unwrap_or_else(
                |_| {
                    "https://goldencopy.gleif.org/api/v2/golden-copies/publishes/lastVersion"
                        .to_string()
                },
            ),
        })
    }
}
