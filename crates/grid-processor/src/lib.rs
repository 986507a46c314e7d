//! Grid processing for assembled climate model series.
//!
//! This crate moves model output onto a common observational grid:
//!
//! - Bilinear or nearest-neighbour horizontal regridding ([`GridHarmonizer`])
//! - Pressure-level matching with Pa → hPa normalisation
//! - Loading the reference dataset that defines the target grid and its
//!   validity mask ([`ReferenceDataset`], [`ValidityMask`])
//! - Area-weighted global means ([`global_mean`], [`field_global_mean`])

pub mod error;
pub mod harmonize;
pub mod levels;
pub mod mask;
pub mod projection;
pub mod reduce;
pub mod reference;
pub mod types;

pub use error::{GridProcessorError, Result};
pub use harmonize::GridHarmonizer;
pub use levels::{match_levels, normalize_to_hpa};
pub use mask::{MaskStats, ValidityMask};
pub use projection::RegridPlan;
pub use reduce::{field_global_mean, global_mean, latitude_weights};
pub use reference::ReferenceDataset;
pub use types::{InterpolationMethod, TargetGrid};
