//! Core error types for focusroom-core.
//!
//! This module defines the error hierarchy using thiserror. Structured join
//! failures are surfaced to the caller; everything on the teardown path is
//! logged and swallowed by the lifecycle manager instead (see `membership`).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Room join failures
    #[error("Join error: {0}")]
    Join(#[from] JoinError),

    /// Backend transport errors
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

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

/// Structured reasons a room join can fail.
///
/// Joins are safely retryable; none of these variants implies partial state.
#[derive(Error, Debug)]
pub enum JoinError {
    /// The room is at capacity.
    #[error("Room {room_id} is full (capacity {capacity})")]
    RoomFull { room_id: String, capacity: u32 },

    /// No room with this id exists (it may have been swept).
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// The user already holds an active participant entry.
    #[error("Already joined room {0}")]
    AlreadyJoined(String),

    /// Transport-level failure; the join may be retried.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Backend transport errors.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Request could not be delivered.
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status.
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The presence channel is no longer accepting publishes.
    #[error("Presence channel closed")]
    ChannelClosed,
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Network(err.to_string())
    }
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

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// No usable config/data directory on this platform
    #[error("Could not determine {0} directory")]
    NoBaseDir(&'static str),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Session duration outside the accepted bounds; refused, not clamped.
    #[error("Session duration {minutes} min out of range ({min}..={max} min)")]
    DurationOutOfRange { minutes: u64, min: u64, max: u64 },

    /// Invalid time range
    #[error("Invalid time range: end ({end}) must not precede start ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
