//! API server configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;

use serde::{Deserialize, Serialize};

/// Front desk API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Upper bound on pooled SQLite connections
    pub max_connections: u32,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (the process
    /// environment in production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = ApiConfig {
            port: lookup("STAYLINE_API_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("STAYLINE_API_PORT".to_string()))?,

            database_path: lookup("STAYLINE_DB_PATH").unwrap_or_else(|| "stayline.db".to_string()),

            max_connections: lookup("STAYLINE_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("STAYLINE_DB_MAX_CONNECTIONS".to_string()))?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("STAYLINE_DB_PATH".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("STAYLINE_DB_MAX_CONNECTIONS".to_string()));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),

    #[error("Missing required environment variable: {0}")]
    MissingRequired(String),
}
