//! services/client/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub token_path: PathBuf,
    pub log_level: Level,
    pub request_timeout_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_base_url = std::env::var("NUTRIPET_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());

        let token_path = std::env::var("NUTRIPET_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.nutripet/tokens.json"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let request_timeout_secs = match std::env::var("NUTRIPET_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(
                    "NUTRIPET_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a number of seconds", raw),
                )
            })?,
            Err(_) => 30,
        };

        Ok(Self {
            api_base_url,
            token_path,
            log_level,
            request_timeout_secs,
        })
    }
}
