//! Interpolation methods for grid resampling.

use crate::error::{GridProcessorError, Result};
use crate::types::InterpolationMethod;

/// Nearest neighbor interpolation.
///
/// Returns the value of the nearest grid point. `x` and `y` are fractional
/// column and row indices.
pub fn nearest_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    let col = x.round() as usize;
    let row = y.round() as usize;

    if col >= width || row >= height {
        return f32::NAN;
    }

    data[row * width + col]
}

/// Bilinear interpolation.
///
/// Smoothly interpolates between the four nearest grid points. `x` and `y`
/// are fractional column and row indices.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if x < 0.0 || y < 0.0 {
        return f32::NAN;
    }

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;

    if x0 >= width || y0 >= height {
        return f32::NAN;
    }

    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = (x - x0 as f64) as f32;
    let yf = (y - y0 as f64) as f32;

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    // Handle NaN values - if any corner is NaN, return NaN
    if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
        return f32::NAN;
    }

    // Written as offsets from the lower corner so a constant neighbourhood
    // reproduces its value exactly.
    let top = v00 + (v10 - v00) * xf;
    let bottom = v01 + (v11 - v01) * xf;
    top + (bottom - top) * yf
}

/// Locates coordinate values within a strictly monotonic 1-D axis.
#[derive(Debug, Clone)]
pub struct AxisLookup {
    /// Coordinates sign-adjusted so they are ascending
    ascending: Vec<f64>,
    sign: f64,
}

impl AxisLookup {
    /// Build a lookup for `coords`, which may be ascending or descending.
    pub fn new(coords: &[f64]) -> Result<Self> {
        if coords.is_empty() {
            return Err(GridProcessorError::invalid_grid("empty coordinate axis"));
        }
        let sign = if coords.len() > 1 && coords[1] < coords[0] { -1.0 } else { 1.0 };
        let ascending: Vec<f64> = coords.iter().map(|c| c * sign).collect();
        if ascending.windows(2).any(|w| w[1] <= w[0]) {
            return Err(GridProcessorError::invalid_grid(
                "coordinate axis is not strictly monotonic",
            ));
        }
        Ok(Self { ascending, sign })
    }

    /// Fractional index of `value`, or `None` when it falls outside the axis span.
    pub fn locate(&self, value: f64) -> Option<f64> {
        let v = value * self.sign;
        let c = &self.ascending;
        let n = c.len();

        if v.is_nan() || v < c[0] || v > c[n - 1] {
            return None;
        }
        if n == 1 {
            return Some(0.0);
        }

        let upper = c.partition_point(|&x| x <= v).clamp(1, n - 1);
        let lower = upper - 1;
        let frac = (v - c[lower]) / (c[upper] - c[lower]);
        Some(lower as f64 + frac)
    }
}

/// Precomputed source positions for every target cell of one native → target mapping.
///
/// Building the plan once per member lets every time step and level reuse
/// the coordinate search.
#[derive(Debug, Clone)]
pub struct RegridPlan {
    src_width: usize,
    src_height: usize,
    /// Fractional source column per target longitude
    cols: Vec<Option<f64>>,
    /// Fractional source row per target latitude
    rows: Vec<Option<f64>>,
    method: InterpolationMethod,
}

impl RegridPlan {
    pub fn new(
        src_lat: &[f64],
        src_lon: &[f64],
        dst_lat: &[f64],
        dst_lon: &[f64],
        method: InterpolationMethod,
    ) -> Result<Self> {
        let lat_axis = AxisLookup::new(src_lat)?;
        let lon_axis = AxisLookup::new(src_lon)?;

        Ok(Self {
            src_width: src_lon.len(),
            src_height: src_lat.len(),
            cols: dst_lon.iter().map(|&x| lon_axis.locate(x)).collect(),
            rows: dst_lat.iter().map(|&y| lat_axis.locate(y)).collect(),
            method,
        })
    }

    /// Number of target cells produced per plane.
    pub fn dst_len(&self) -> usize {
        self.cols.len() * self.rows.len()
    }

    /// Interpolate one native plane into `out` (row-major, target lat × lon).
    /// Target cells outside the native span are set to NaN.
    pub fn apply(&self, src: &[f32], out: &mut [f32]) {
        let width = self.cols.len();
        for (j, row) in self.rows.iter().enumerate() {
            for (i, col) in self.cols.iter().enumerate() {
                out[j * width + i] = match (col, row) {
                    (Some(x), Some(y)) => match self.method {
                        InterpolationMethod::Nearest => {
                            nearest_interpolate(src, self.src_width, self.src_height, *x, *y)
                        }
                        InterpolationMethod::Bilinear => {
                            bilinear_interpolate(src, self.src_width, self.src_height, *x, *y)
                        }
                    },
                    _ => f32::NAN,
                };
            }
        }
    }
}
