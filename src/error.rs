//! Error types shared by the pixel pipeline, config and project modules.

use thiserror::Error;

/// Errors raised by the image pipeline and the local persistence layers.
#[derive(Debug, Error)]
pub enum RestyleError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Invalid crop region: {0}")]
    InvalidCrop(String),

    #[error("Invalid tile count: {0}")]
    InvalidTileCount(String),

    #[error("Empty mask: {0}")]
    EmptyMask(String),

    #[error("Invalid data URI: {0}")]
    DataUri(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid project file: {0}")]
    InvalidProject(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RestyleError>;
