//! Error types for biosync

use thiserror::Error;

/// Result type alias for biosync operations
pub type Result<T> = std::result::Result<T, BiosyncError>;

/// Main error type for biosync
#[derive(Error, Debug)]
pub enum BiosyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown database configuration: {0}")]
    DatabaseNotFound(String),

    #[error("Unknown sync table: {0}")]
    UnknownTable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
