//! Core error types for habitloop-core.
//!
//! Everything fallible in the check-in pipeline reports through
//! [`CoreError`]. Timer misuse is deliberately absent: invalid timer
//! transitions are no-ops, not errors.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for habitloop-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Check-in flow errors
    #[error("Check-in flow error: {0}")]
    Flow(#[from] FlowError),

    /// A collaborator call failed
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A row with the same key already exists
    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to determine the data directory
    #[error("Cannot resolve data directory: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A timed challenge was submitted without enough timer progress
    #[error("Challenge '{challenge_id}' requires a timed session before check-in")]
    TimedSessionIncomplete { challenge_id: String },

    /// Day numbers start at 1
    #[error("Invalid day number {day} for challenge '{challenge_id}'")]
    InvalidDay { challenge_id: String, day: u32 },

    /// Empty value where content is required
    #[error("Empty value for '{0}'")]
    Empty(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors from driving the check-in flow in the wrong state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// `submit` called after the check-in was already accepted
    #[error("Check-in already submitted")]
    AlreadySubmitted,

    /// `advance` called while no stage is on screen
    #[error("No stage is being presented")]
    NotPresenting,

    /// The flow already closed
    #[error("Check-in flow is closed")]
    Closed,

    /// The current stage does not accept this choice
    #[error("Stage '{stage}' does not accept choice '{choice}'")]
    ChoiceNotAccepted { stage: String, choice: String },
}

/// Failure reported by an external collaborator (document store, sync
/// backend). Always session scoped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Remote call '{operation}' failed: {message}")]
pub struct RemoteError {
    pub operation: String,
    pub message: String,
}

impl RemoteError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) => match e.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    DatabaseError::Locked
                }
                rusqlite::ErrorCode::ConstraintViolation => {
                    DatabaseError::Duplicate(msg.clone().unwrap_or_else(|| err.to_string()))
                }
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<DatabaseError> for RemoteError {
    fn from(err: DatabaseError) -> Self {
        RemoteError::new("database", err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_displays_operation() {
        let err = RemoteError::new("submit_check_in", "offline");
        assert_eq!(err.to_string(), "Remote call 'submit_check_in' failed: offline");
    }

    #[test]
    fn core_error_wraps_validation() {
        let err: CoreError = ValidationError::TimedSessionIncomplete {
            challenge_id: "read-daily".into(),
        }
        .into();
        assert!(err.to_string().contains("read-daily"));
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn remote_error_is_transparent() {
        let err: CoreError = RemoteError::new("fetch_seen_milestones", "timeout").into();
        assert_eq!(
            err.to_string(),
            "Remote call 'fetch_seen_milestones' failed: timeout"
        );
    }
}
