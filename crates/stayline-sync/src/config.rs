//! # Desk Configuration
//!
//! Configuration for the front-desk session services.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STAYLINE_DB_PATH=/var/lib/stayline/stayline.db                     │
//! │     STAYLINE_PERSIST_TIMEOUT_MS=8000                                   │
//! │     STAYLINE_FANOUT_FAILURE_RATE=0.0                                   │
//! │     STAYLINE_FANOUT_ENABLED=false                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stayline/stayline.toml (Linux)                           │
//! │     ~/Library/Application Support/com.stayline.desk/stayline.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [property]
//! id = "h-1"
//! name = "Hotel Satsangi"
//!
//! [database]
//! path = "stayline.db"
//!
//! [persistence]
//! timeout_ms = 5000
//! max_retries = 3
//! initial_backoff_ms = 200
//! max_backoff_ms = 5000
//!
//! [fanout]
//! enabled = true
//! min_latency_ms = 1000
//! max_latency_ms = 3000
//! failure_rate = 0.10
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Property
// =============================================================================

/// Which property this desk runs for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyConfig {
    pub id: String,

    #[serde(default)]
    pub name: String,
}

impl Default for PropertyConfig {
    fn default() -> Self {
        PropertyConfig {
            id: "h-1".to_string(),
            name: "My Hotel".to_string(),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("stayline.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: default_db_path(),
        }
    }
}

// =============================================================================
// Persistence Settings
// =============================================================================

/// Timeout and retry policy for writes to the backend.
///
/// ## Retry Timeline (defaults)
/// ```text
/// attempt 1 ──5s deadline──► fail ─ ~200ms ─► attempt 2 ─ ~400ms ─► attempt 3
///                                                            │
///                                             still failing  ▼
///                                                   PersistFailure event
///                                                   (local change kept)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceSettings {
    /// Deadline for a single persist attempt.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Attempts after the first one. 0 disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}
fn default_max_retries() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    200
}
fn default_max_backoff_ms() -> u64 {
    5000
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        PersistenceSettings {
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl PersistenceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

// =============================================================================
// Fan-out Settings
// =============================================================================

/// Channel notification simulation.
///
/// Every connected channel gets its own delay drawn from
/// `min_latency_ms..=max_latency_ms` and fails with `failure_rate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_min_latency_ms")]
    pub min_latency_ms: u64,

    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,

    /// Probability in `0.0..=1.0` that a delivery reports `error`.
    #[serde(default = "default_failure_rate")]
    pub failure_rate: f64,
}

fn default_true() -> bool {
    true
}
fn default_min_latency_ms() -> u64 {
    1000
}
fn default_max_latency_ms() -> u64 {
    3000
}
fn default_failure_rate() -> f64 {
    0.10
}

impl Default for FanoutSettings {
    fn default() -> Self {
        FanoutSettings {
            enabled: true,
            min_latency_ms: default_min_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
            failure_rate: default_failure_rate(),
        }
    }
}

// =============================================================================
// Main Desk Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeskConfig {
    #[serde(default)]
    pub property: PropertyConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub persistence: PersistenceSettings,

    #[serde(default)]
    pub fanout: FanoutSettings,
}

impl DeskConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (stayline.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading desk config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load desk config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Desk config saved");
        Ok(())
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.property.id.trim().is_empty() {
            return Err(SyncError::InvalidConfig("property.id must not be empty".into()));
        }

        if self.persistence.timeout_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "persistence.timeout_ms must be greater than 0".into(),
            ));
        }

        if self.persistence.initial_backoff_ms > self.persistence.max_backoff_ms {
            return Err(SyncError::InvalidConfig(format!(
                "persistence.initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.persistence.initial_backoff_ms, self.persistence.max_backoff_ms
            )));
        }

        if self.fanout.min_latency_ms > self.fanout.max_latency_ms {
            return Err(SyncError::InvalidConfig(format!(
                "fanout.min_latency_ms ({}) exceeds max_latency_ms ({})",
                self.fanout.min_latency_ms, self.fanout.max_latency_ms
            )));
        }

        if !(0.0..=1.0).contains(&self.fanout.failure_rate) {
            return Err(SyncError::InvalidConfig(format!(
                "fanout.failure_rate must be within 0.0..=1.0, got {}",
                self.fanout.failure_rate
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("STAYLINE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(timeout) = std::env::var("STAYLINE_PERSIST_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms) => self.persistence.timeout_ms = ms,
                Err(_) => warn!(value = %timeout, "Ignoring unparsable STAYLINE_PERSIST_TIMEOUT_MS"),
            }
        }

        if let Ok(rate) = std::env::var("STAYLINE_FANOUT_FAILURE_RATE") {
            match rate.parse::<f64>() {
                Ok(r) => self.fanout.failure_rate = r,
                Err(_) => warn!(value = %rate, "Ignoring unparsable STAYLINE_FANOUT_FAILURE_RATE"),
            }
        }

        if let Ok(enabled) = std::env::var("STAYLINE_FANOUT_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.fanout.enabled = true,
                "0" | "false" | "no" | "off" => self.fanout.enabled = false,
                _ => warn!(value = %enabled, "Unknown STAYLINE_FANOUT_ENABLED value"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stayline", "desk")
            .map(|dirs| dirs.config_dir().join("stayline.toml"))
    }
}
