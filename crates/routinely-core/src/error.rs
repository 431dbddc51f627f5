//! Core error types for routinely-core.
//!
//! Errors are grouped by origin. Validation and routine-state errors are
//! returned to the caller; location and persistence errors are usually
//! handed to an [`ErrorReporter`](crate::reporting::ErrorReporter) while the
//! calling operation falls back to default data.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for routinely-core.
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

    /// Session lifecycle errors
    #[error("Routine state error: {0}")]
    RoutineState(#[from] RoutineStateError),

    /// Companion device message errors
    #[error("Companion error: {0}")]
    Companion(#[from] crate::companion::CompanionError),

    /// Export bundle errors
    #[error("Export error: {0}")]
    Export(#[from] crate::export::ExportError),

    /// Location errors
    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
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

    /// A stored record could not be decoded
    #[error("Corrupted record '{key}': {message}")]
    CorruptedRecord { key: String, message: String },

    /// Encoding a record for storage failed
    #[error("Failed to encode record '{key}': {message}")]
    EncodeFailed { key: String, message: String },

    /// Storage is out of space
    #[error("Storage is full")]
    StorageFull,

    /// Database is locked
    #[error("Database is locked")]
    Locked,
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors for user-authored records.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Too many entries
    #[error("Too many entries in {collection}: {len} (max {max})")]
    TooMany {
        collection: String,
        len: usize,
        max: usize,
    },

    /// Out of bounds
    #[error("Index {index} out of bounds for {collection} (length: {len})")]
    OutOfBounds {
        collection: String,
        index: usize,
        len: usize,
    },

    /// Referenced record does not exist
    #[error("Unknown {kind} '{id}'")]
    UnknownId { kind: String, id: String },

    /// Built-in record cannot be removed
    #[error("Built-in {kind} '{id}' cannot be deleted")]
    BuiltinImmutable { kind: String, id: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Errors from session lifecycle operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutineStateError {
    /// An operation needed a running session but none is active
    #[error("No active routine session")]
    NoActiveSession,

    /// A session was started while another one is running
    #[error("Routine session {session_id} is already active")]
    SessionAlreadyActive { session_id: String },

    /// The session has already finished
    #[error("Routine session {session_id} is already completed")]
    SessionCompleted { session_id: String },
}

/// Errors reported by the location boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// The user denied location access
    #[error("Location permission denied")]
    PermissionDenied,

    /// No usable signal
    #[error("Location signal unavailable")]
    Unavailable,

    /// The device did not report a fix in time
    #[error("Location request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// A coordinate outside the valid range was reported
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: String, longitude: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => match e.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    DatabaseError::Locked
                }
                rusqlite::ErrorCode::DiskFull => DatabaseError::StorageFull,
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

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

impl CoreError {
    /// Whether the error came from a device or storage collaborator and
    /// should go to the side channel instead of interrupting the caller.
    pub fn is_side_channel(&self) -> bool {
        matches!(
            self,
            CoreError::Database(_) | CoreError::Location(_) | CoreError::Io(_) | CoreError::Json(_)
        )
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
