//! Error types for NetCDF parsing operations.

use cmip_common::CmipError;
use std::path::Path;
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error reported by libnetcdf
    #[error("NetCDF library error: {0}")]
    Library(#[from] netcdf::Error),

    /// Missing required variable or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

impl NetCdfError {
    /// Attach the file path and convert into the shared read error.
    pub fn into_read(self, path: &Path) -> CmipError {
        CmipError::read(path, self.to_string())
    }

    /// Attach the file path and convert into the shared write error.
    pub fn into_write(self, path: &Path) -> CmipError {
        CmipError::write(path, self.to_string())
    }
}
