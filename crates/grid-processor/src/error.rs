//! Error types for grid processing.

use cmip_common::CmipError;
use thiserror::Error;

/// Errors that can occur during grid processing.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// A requested pressure level has no exact counterpart in the native data.
    #[error("pressure level {level} hPa not present in native levels {available:?}")]
    LevelLookup { level: f64, available: Vec<f64> },

    /// A field with a level axis was harmonized against a grid without levels.
    #[error("target grid has no pressure levels for a field with a level axis")]
    NoTargetLevels,

    /// Coordinates that cannot be used for interpolation.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// The mask and the field disagree in shape.
    #[error("mask shape mismatch: {0}")]
    MaskShape(String),

    /// Field construction failed.
    #[error(transparent)]
    Field(#[from] CmipError),
}

impl GridProcessorError {
    /// Create an InvalidGrid error.
    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }

    /// Create a MaskShape error.
    pub fn mask_shape(msg: impl Into<String>) -> Self {
        Self::MaskShape(msg.into())
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
