//! Core types for grid processing.

use serde::{Deserialize, Serialize};

/// Spatial interpolation order used when regridding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Order 0: nearest neighbor (preserves exact values).
    Nearest,
    /// Order 1: bilinear interpolation.
    #[default]
    Bilinear,
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Bilinear => write!(f, "bilinear"),
        }
    }
}

/// The common grid all members are harmonized onto.
///
/// Latitude is ascending, longitude ascending in the 0-360 convention,
/// pressure levels in hPa.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGrid {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub pressure_levels: Vec<f64>,
}

impl TargetGrid {
    pub fn new(lat: Vec<f64>, lon: Vec<f64>, pressure_levels: Vec<f64>) -> Self {
        Self {
            lat,
            lon,
            pressure_levels,
        }
    }

    pub fn plane_len(&self) -> usize {
        self.lat.len() * self.lon.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_method_display() {
        assert_eq!(InterpolationMethod::Nearest.to_string(), "nearest");
        assert_eq!(InterpolationMethod::Bilinear.to_string(), "bilinear");
    }
}
