//! Pressure-level normalisation and exact-value level matching.

use cmip_common::LevelAxis;
use tracing::debug;

use crate::error::{GridProcessorError, Result};

/// Tolerance for treating two hPa values as the same level; absorbs the
/// rounding of the Pa → hPa division and nothing more.
const LEVEL_EPSILON: f64 = 1e-6;

/// Whether a units string denotes Pascals.
fn is_pascal(units: &str) -> bool {
    units.trim().eq_ignore_ascii_case("pa")
}

/// Level values in hPa, dividing by 100 when the axis is in Pa.
pub fn normalize_to_hpa(levels: &LevelAxis) -> Vec<f64> {
    if is_pascal(&levels.units) {
        levels.values.iter().map(|p| p / 100.0).collect()
    } else {
        levels.values.clone()
    }
}

/// Index into `native_hpa` of every level in `target_hpa`, in target order.
///
/// Every target level must be present in the native axis; a missing level
/// is an error rather than a dropped index so downstream level positions
/// stay aligned with the target grid.
pub fn match_levels(native_hpa: &[f64], target_hpa: &[f64]) -> Result<Vec<usize>> {
    let indices = target_hpa
        .iter()
        .map(|&level| {
            native_hpa
                .iter()
                .position(|&n| (n - level).abs() <= LEVEL_EPSILON)
                .ok_or_else(|| GridProcessorError::LevelLookup {
                    level,
                    available: native_hpa.to_vec(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        native = native_hpa.len(),
        target = target_hpa.len(),
        "Matched pressure levels"
    );
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pa() {
        let axis = LevelAxis::new(vec![100000.0, 85000.0, 1000.0], "Pa");
        assert_eq!(normalize_to_hpa(&axis), vec![1000.0, 850.0, 10.0]);
    }

    #[test]
    fn test_normalize_hpa_untouched() {
        let axis = LevelAxis::new(vec![1000.0, 850.0], "hPa");
        assert_eq!(normalize_to_hpa(&axis), vec![1000.0, 850.0]);
    }

    #[test]
    fn test_match_levels_in_target_order() {
        let native = [1000.0, 850.0, 700.0, 500.0, 300.0];
        let target = [300.0, 850.0];
        assert_eq!(match_levels(&native, &target).unwrap(), vec![4, 1]);
    }

    #[test]
    fn test_match_levels_missing() {
        let native = [1000.0, 850.0];
        let err = match_levels(&native, &[925.0]).unwrap_err();
        match err {
            GridProcessorError::LevelLookup { level, available } => {
                assert_eq!(level, 925.0);
                assert_eq!(available, vec![1000.0, 850.0]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
