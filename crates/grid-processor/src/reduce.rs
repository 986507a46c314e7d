//! Area-weighted global means.
//!
//! Cells are weighted by the cosine of their latitude. A plane with no
//! usable cell has no mean; callers receive `None` rather than a NaN or a
//! zero that would be indistinguishable from a real average.

use cmip_common::Field;

/// cos(latitude) for each latitude in degrees.
pub fn latitude_weights(lat: &[f64]) -> Vec<f64> {
    lat.iter().map(|l| l.to_radians().cos()).collect()
}

/// Weighted mean of one `[lat, lon]` plane.
///
/// With `mask_aware`, missing cells are removed from both the weighted sum
/// and the weight total. Without it, missing cells are skipped in the sum
/// but the weight total is the full-grid total `full_weight_sum`.
fn plane_mean(
    plane: &[f32],
    weights: &[f64],
    n_lon: usize,
    mask_aware: bool,
    full_weight_sum: f64,
) -> Option<f64> {
    let mut sum = 0.0;
    let mut weight_sum = 0.0;
    let mut valid = 0usize;

    for (row, &w) in plane.chunks(n_lon).zip(weights) {
        for &v in row {
            if v.is_nan() {
                continue;
            }
            sum += w * v as f64;
            weight_sum += w;
            valid += 1;
        }
    }

    let denominator = if mask_aware { weight_sum } else { full_weight_sum };
    if valid == 0 || denominator <= 0.0 {
        return None;
    }
    Some(sum / denominator)
}

/// Weighted mean of every `[lat, lon]` plane in `values`.
pub fn global_mean(values: &[f32], lat: &[f64], n_lon: usize, mask_aware: bool) -> Vec<Option<f64>> {
    let plane_len = lat.len() * n_lon;
    if plane_len == 0 {
        return Vec::new();
    }

    let weights = latitude_weights(lat);
    let full_weight_sum: f64 = weights.iter().sum::<f64>() * n_lon as f64;

    values
        .chunks(plane_len)
        .map(|plane| plane_mean(plane, &weights, n_lon, mask_aware, full_weight_sum))
        .collect()
}

/// Weighted mean per time step and level, ordered `[time, level]`.
pub fn field_global_mean(field: &Field, mask_aware: bool) -> Vec<Option<f64>> {
    global_mean(&field.values, &field.lat, field.lon.len(), mask_aware)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_weights_reproduce_arithmetic_mean() {
        // All rows on the equator: uniform weights
        let lat = [0.0, 0.0];
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let means = global_mean(&values, &lat, 3, false);
        assert_eq!(means, vec![Some(3.5)]);
    }

    #[test]
    fn test_weights_favour_low_latitudes() {
        let lat = [0.0, 60.0];
        // equator row = 1, 60N row = 0; weights 1 and 0.5
        let values = [1.0, 1.0, 0.0, 0.0];
        let mean = global_mean(&values, &lat, 2, true)[0].unwrap();
        assert!((mean - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_mask_aware_excludes_missing_weights() {
        let lat = [0.0, 0.0];
        let values = [2.0, f32::NAN, 4.0, f32::NAN];
        assert_eq!(global_mean(&values, &lat, 2, true), vec![Some(3.0)]);
        // Full-grid denominator halves the result
        assert_eq!(global_mean(&values, &lat, 2, false), vec![Some(1.5)]);
    }

    #[test]
    fn test_all_missing_plane_is_none() {
        let lat = [10.0, 20.0];
        let values = [1.0, 1.0, 1.0, 1.0, f32::NAN, f32::NAN, f32::NAN, f32::NAN];
        let means = global_mean(&values, &lat, 2, true);
        assert_eq!(means.len(), 2);
        assert!(means[0].is_some());
        assert_eq!(means[1], None);
        assert_eq!(global_mean(&values, &lat, 2, false)[1], None);
    }
}
