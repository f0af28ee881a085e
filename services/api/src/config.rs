//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// What DELETE /materials/{id} does to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Flip the active flag, keep the record. The authoritative contract.
    Soft,
    /// Physically remove the row.
    Hard,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub low_stock_threshold: i32,
    pub operation_log_capacity: usize,
    pub delete_policy: DeletePolicy,
    pub cors_origin: String,
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

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Inventory Settings ---
        let low_stock_threshold = env_parse(
            "LOW_STOCK_THRESHOLD",
            inventory_core::stats::DEFAULT_LOW_STOCK_THRESHOLD,
        )?;
        let operation_log_capacity = env_parse(
            "OPERATION_LOG_CAPACITY",
            inventory_core::oplog::DEFAULT_CAPACITY,
        )?;

        let delete_policy = match std::env::var("DELETE_POLICY")
            .unwrap_or_else(|_| "soft".to_string())
            .to_lowercase()
            .as_str()
        {
            "soft" => DeletePolicy::Soft,
            "hard" => DeletePolicy::Hard,
            other => {
                return Err(ConfigError::InvalidValue(
                    "DELETE_POLICY".to_string(),
                    format!("'{}' is not 'soft' or 'hard'", other),
                ))
            }
        };

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            low_stock_threshold,
            operation_log_capacity,
            delete_policy,
            cors_origin,
        })
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}
