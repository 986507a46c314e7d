//! Error types for the assembly crate.

use cmip_common::{CmipError, Dimensionality};
use grid_processor::GridProcessorError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single ensemble member was left out of the run.
///
/// A skipped member never aborts the batch; the reason is logged and
/// recorded in the run report.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("{fragments} fragments selected, more than the limit of {limit}")]
    OversizeSkip { fragments: usize, limit: usize },

    #[error("no fragment overlaps the requested window")]
    NoFragments,

    #[error("fragments could not be concatenated: {message}")]
    ConcatenationFailure { message: String },

    #[error("fragment could not be read: {message}")]
    ReadFailure { message: String },

    #[error("pressure level {level} hPa not present in native data")]
    LevelLookupFailure { level: f64 },

    #[error("member is {found:?} but the run started with {expected:?} fields")]
    DimensionalityMismatch {
        expected: Dimensionality,
        found: Dimensionality,
    },

    #[error("no continuation experiment data for this member")]
    ContinuationMissing,

    #[error("offset {date_diff} leaves no data in a series of {available_months} months")]
    EmptyWindow { date_diff: usize, available_months: usize },

    #[error("regridding failed: {message}")]
    HarmonizeFailure { message: String },

    #[error("masking failed: {message}")]
    MaskFailure { message: String },

    #[error("output could not be written: {message}")]
    WriteFailure { message: String },
}

/// Errors that can occur during assembly.
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Archive root {0} is not a readable directory")]
    ArchiveRoot(PathBuf),

    #[error("Member skipped: {0}")]
    Skip(#[from] SkipReason),

    #[error(transparent)]
    Cmip(#[from] CmipError),

    #[error(transparent)]
    Grid(#[from] GridProcessorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssemblyError {
    /// Classify an error raised while processing one member.
    pub fn into_skip_reason(self) -> SkipReason {
        match self {
            AssemblyError::Skip(reason) => reason,
            other => SkipReason::ReadFailure {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for assembly operations.
pub type Result<T> = std::result::Result<T, AssemblyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_serializes_with_tag() {
        let reason = SkipReason::OversizeSkip {
            fragments: 25,
            limit: 20,
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "oversize_skip");
        assert_eq!(json["fragments"], 25);
    }

    #[test]
    fn test_unexpected_errors_become_read_failures() {
        let err = AssemblyError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(matches!(err.into_skip_reason(), SkipReason::ReadFailure { .. }));

        let err = AssemblyError::from(SkipReason::ContinuationMissing);
        assert_eq!(err.into_skip_reason(), SkipReason::ContinuationMissing);
    }
}
