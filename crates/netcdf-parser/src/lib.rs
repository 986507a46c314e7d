//! NetCDF access for CMIP model output.
//!
//! This crate implements the archive read/write seams defined in
//! `cmip-common` on top of the native `netcdf` library:
//!
//! - [`NetcdfReader`] opens a model fragment (or the observational reference
//!   file), reads one named variable with its `lat`/`lon`/level coordinates and
//!   normalises `_FillValue`/`missing_value` cells to not-a-number.
//! - [`NetcdfSeriesWriter`] writes an assembled series as a CF-style file with
//!   an unlimited `time` dimension.
//!
//! # Implementation Notes
//!
//! libnetcdf needs a real file path, so both sides work directly on paths.
//! HDF5 prints diagnostics to stderr for handled errors such as absent
//! optional attributes; call [`silence_hdf5_errors`] once at startup.

pub mod error;
mod native;
mod writer;

pub use error::{NetCdfError, NetCdfResult};
pub use native::{read_fragment, silence_hdf5_errors, NetcdfReader};
pub use writer::{write_series, NetcdfSeriesWriter, OUTPUT_FILL_VALUE};
