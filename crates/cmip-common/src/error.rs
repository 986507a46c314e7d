//! Error types shared by the assembly crates.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using CmipError.
pub type CmipResult<T> = Result<T, CmipError>;

/// Errors raised by the shared domain types and the archive read/write seams.
#[derive(Debug, Error)]
pub enum CmipError {
    #[error("Unrecognised fragment filename '{name}': {reason}")]
    FragmentName { name: String, reason: String },

    #[error("Invalid time window {start}-{end}: end year precedes start year")]
    InvalidWindow { start: i32, end: i32 },

    #[error("Invalid field shape: {0}")]
    InvalidShape(String),

    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CmipError {
    /// Create a Read error.
    pub fn read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a Write error.
    pub fn write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
        }
    }
}
