//! Error types shared across Tillscan crates.

use std::path::PathBuf;

/// Top-level error type for Tillscan operations.
#[derive(Debug, thiserror::Error)]
pub enum TillscanError {
    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Catalog error: {message}")]
    Catalog { message: String },

    #[error("Sale error: {message}")]
    Sale { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using TillscanError.
pub type TillscanResult<T> = Result<T, TillscanError>;

impl TillscanError {
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog {
            message: msg.into(),
        }
    }

    pub fn sale(msg: impl Into<String>) -> Self {
        Self::Sale {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
