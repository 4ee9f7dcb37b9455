//! Service-layer error types
//!
//! This module defines error types specific to the service layer,
//! mapping core and store errors to service-level errors.

use sizewatch_core::CoreError;
use sizewatch_store::StoreError;
use thiserror::Error;

/// Result type alias for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Service-layer error types
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Release or asset metadata could not be retrieved
    #[error("Fetch failed for {target}: {message}")]
    Fetch { target: String, message: String },

    /// Release data is unusable for version selection
    #[error("Invalid release data: {0}")]
    InvalidReleaseData(String),

    /// Notification could not be delivered
    #[error("Notification failed: {0}")]
    Notification(String),

    /// Dedup cache could not be loaded or written
    #[error("Change store error: {0}")]
    Store(#[from] StoreError),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Build a fetch error for the given resource
    pub fn fetch(target: impl Into<String>, message: impl ToString) -> Self {
        ServiceError::Fetch {
            target: target.into(),
            message: message.to_string(),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidVersion { .. } => ServiceError::InvalidReleaseData(err.to_string()),
            CoreError::SerializationError(msg) => ServiceError::InvalidReleaseData(msg),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(err.to_string())
    }
}

impl From<regex::Error> for ServiceError {
    fn from(err: regex::Error) -> Self {
        ServiceError::Configuration(format!("Invalid asset pattern: {}", err))
    }
}
