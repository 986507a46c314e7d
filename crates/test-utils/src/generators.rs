//! Synthetic field generators for testing.

use cmip_common::{Field, LevelAxis};

/// Evenly spaced coordinate values.
pub fn regular_axis(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Build a field by evaluating `f(t, level_index, lat, lon)` at every cell.
pub fn field_from_fn<F>(
    n_time: usize,
    levels: Option<LevelAxis>,
    lat: &[f64],
    lon: &[f64],
    f: F,
) -> Field
where
    F: Fn(usize, usize, f64, f64) -> f32,
{
    let n_levels = levels.as_ref().map(|l| l.len()).unwrap_or(1);
    let mut values = Vec::with_capacity(n_time * n_levels * lat.len() * lon.len());
    for t in 0..n_time {
        for k in 0..n_levels {
            for &y in lat {
                for &x in lon {
                    values.push(f(t, k, y, x));
                }
            }
        }
    }
    Field::new(values, n_time, levels, lat.to_vec(), lon.to_vec()).expect("generated field shape")
}

/// A field holding `value` everywhere.
pub fn constant_field(
    n_time: usize,
    levels: Option<LevelAxis>,
    lat: &[f64],
    lon: &[f64],
    value: f32,
) -> Field {
    field_from_fn(n_time, levels, lat, lon, |_, _, _, _| value)
}

/// A coarse global model grid: 2.5° latitude (-88.75..88.75), 5° longitude (0..355).
pub fn coarse_global_grid() -> (Vec<f64>, Vec<f64>) {
    (regular_axis(-88.75, 2.5, 72), regular_axis(0.0, 5.0, 72))
}

/// Standard model pressure levels in Pa, surface upward.
pub fn model_pressure_levels_pa() -> LevelAxis {
    LevelAxis::new(
        vec![
            100000.0, 92500.0, 85000.0, 70000.0, 60000.0, 50000.0, 40000.0, 30000.0, 25000.0,
            20000.0, 15000.0, 10000.0, 7000.0, 5000.0, 3000.0, 2000.0, 1000.0,
        ],
        "Pa",
    )
}
