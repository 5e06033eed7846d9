//! # Sync Error Types
//!
//! Error types for the desk services.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Persistence   │  │     Engine              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  ConnectionFailed│ │  Rule (CoreError)       │ │
//! │  │  ConfigLoad...  │  │  Timeout        │  │                         │ │
//! │  │  ConfigSave...  │  │  Rejected       │  │                         │ │
//! │  └─────────────────┘  │  DatabaseError  │  └─────────────────────────┘ │
//! │                       └─────────────────┘                               │
//! │                                                                         │
//! │  Retryable: ConnectionFailed, Timeout                                  │
//! │  Rejected:  the server answered "no"; refresh, never retry             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use stayline_core::CoreError;
use stayline_db::DbError;
use thiserror::Error;

/// Result type alias for desk service operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid desk configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// The backend could not be reached (pool exhausted, database locked).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A persist attempt ran past its deadline.
    #[error("Persist timed out after {0} ms")]
    Timeout(u64),

    /// The server refused the write (availability conflict, stale version,
    /// duplicate id).
    #[error("Rejected by server ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Gave up after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },

    // =========================================================================
    // Engine Errors
    // =========================================================================
    /// The command was refused locally; nothing was applied.
    #[error(transparent)]
    Rule(#[from] CoreError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Desk services are shutting down")]
    ShuttingDown,

    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<DbError> for SyncError {
    fn from(err: DbError) -> Self {
        if let Some(rule) = err.as_rule() {
            return SyncError::Rejected {
                code: rule.code().to_string(),
                message: rule.to_string(),
            };
        }
        match err {
            DbError::NotFound { .. } => SyncError::Rejected {
                code: "NOT_FOUND".to_string(),
                message: err.to_string(),
            },
            DbError::UniqueViolation { .. } => SyncError::Rejected {
                code: "DUPLICATE".to_string(),
                message: err.to_string(),
            },
            ref e if e.is_transient() => SyncError::ConnectionFailed(e.to_string()),
            other => SyncError::DatabaseError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::DatabaseError(format!("JSON: {err}"))
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// True when the same persist may succeed if tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::ConnectionFailed(_) | SyncError::Timeout(_))
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_) | SyncError::ConfigLoadFailed(_) | SyncError::ConfigSaveFailed(_)
        )
    }

    /// True when the server answered with a verdict rather than failing.
    pub fn is_rejection(&self) -> bool {
        matches!(self, SyncError::Rejected { .. })
    }
}
