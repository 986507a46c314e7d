//! Horizontal coordinate handling for regridding.
//!
//! This module locates target points within native coordinate axes,
//! interpolates native planes onto a target mesh, and reconciles the
//! longitude convention of the observational reference.

pub mod interpolation;
pub mod longitude;

pub use interpolation::{bilinear_interpolate, nearest_interpolate, AxisLookup, RegridPlan};
pub use longitude::{prime_meridian_split, reverse_rows, shift_to_positive_longitudes, swap_longitude_halves};
