//! Store-specific error types and conversions
//!
//! A store that does not exist yet is not an error: stores report it as
//! `Ok(None)` from `load`. Everything here is fatal to a run.

use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Change store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Persisted content could not be parsed
    #[error("Corrupt change store at {location}: {reason}")]
    Corrupt { location: String, reason: String },

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(String),

    /// Key-value backend error
    #[error("Redis error: {0}")]
    Redis(String),

    /// Serialization error while writing
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Check if the persisted content was unreadable
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Redis(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
