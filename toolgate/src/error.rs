//! Error types for toolgate.

use thiserror::Error;

/// Result type alias using [`PermissionError`].
pub type Result<T> = std::result::Result<T, PermissionError>;

#[derive(Debug, Error)]
pub enum PermissionError {
    /// No pending request is registered under this id
    #[error("No pending request with id: {request_id}")]
    RequestNotFound { request_id: String },

    /// The request was dropped before anyone accepted or rejected it
    #[error("Permission request was cancelled before a decision was made")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
