//! Error types for the Tutorly client core.

use std::time::Duration;

/// Top-level error type for the client core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Credential storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Onboarding persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors surfaced by login, registration and identity verification.
///
/// All variants are recoverable: the session stays in its prior state and
/// the user may retry.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Another authentication request is already in progress")]
    Busy,

    #[error("Auth service request failed: {reason}")]
    Service { reason: String },

    #[error("Auth service did not respond within {0:?}")]
    Timeout(Duration),
}

impl AuthError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn service(reason: impl std::fmt::Display) -> Self {
        Self::Service {
            reason: reason.to_string(),
        }
    }
}

/// Credential store errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored value for {key} is corrupted: {reason}")]
    Corrupted { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Onboarding step persistence errors. The step never advances on any of these.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Saving step {step} failed: {reason}")]
    SaveFailed { step: u8, reason: String },

    #[error("Step {step} is still being saved")]
    InFlight { step: u8 },

    #[error("Step {step} is missing required field {field}")]
    MissingField { step: u8, field: &'static str },

    #[error("Onboarding service did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Onboarding was closed when its session ended")]
    SessionEnded,
}

/// Database-related errors (local onboarding draft store).
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for the client core.
pub type Result<T> = std::result::Result<T, Error>;
