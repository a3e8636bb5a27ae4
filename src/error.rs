//! Error types for multi-state stats.

use thiserror::Error;

/// Main error type for stats operations.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown state axis: {0}")]
    UnknownAxis(String),

    #[error("Unknown label '{label}' for state axis: {axis}")]
    UnknownLabel { axis: String, label: String },

    #[error("Malformed data: {0}")]
    MalformedData(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid snapshot format: {0}")]
    InvalidFormat(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Snapshot file is locked by another process")]
    Locked,
}

impl From<serde_json::Error> for StatsError {
    fn from(e: serde_json::Error) -> Self {
        StatsError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for StatsError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        StatsError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for StatsError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        StatsError::Deserialization(e.to_string())
    }
}

/// Result type for stats operations.
pub type Result<T> = std::result::Result<T, StatsError>;
