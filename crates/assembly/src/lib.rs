//! Assembly of analysis-ready CMIP time series.
//!
//! Given a dataset selection and a time window, this crate finds every
//! matching ensemble member on a CMIP archive, stitches its monthly file
//! fragments into one continuous series, optionally regrids and masks it
//! against an observational reference, and writes one file per member.
//!
//! # Architecture
//!
//! - [`ArchiveLocator`]: member discovery with newest-version resolution
//! - [`FileSetResolver`]: fragment selection, fragment limit and read offset
//! - [`TimeSeriesLoader`]: concatenation and window slicing
//! - [`OutputWriter`]: output naming and the overwrite policy
//! - [`PipelineDriver`]: the per-member loop producing a [`RunReport`]

pub mod archive;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod resolver;

// Re-exports
pub use archive::ArchiveLocator;
pub use config::{AssemblyConfig, ContinuationConfig, ReferenceConfig};
pub use error::{AssemblyError, Result, SkipReason};
pub use loader::{LoadedSeries, TimeSeriesLoader};
pub use output::{output_file_name, OutputAction, OutputWriter};
pub use pipeline::{MemberOutcome, MemberStatus, PipelineDriver, RunReport};
pub use resolver::{FileSetResolver, ResolvedFileSet};
