//! Observational validity mask and its application to harmonized fields.

use std::ops::Range;

use cmip_common::{Field, TimeWindow};
use tracing::{debug, warn};

use crate::error::{GridProcessorError, Result};
use crate::levels::normalize_to_hpa;

/// Cells of the reference dataset without a usable observation, laid out
/// `[time, (level,) lat, lon]` on the target grid.
#[derive(Debug, Clone)]
pub struct ValidityMask {
    missing: Vec<bool>,
    n_time: usize,
    /// Pressure levels in hPa, `None` for a surface mask
    levels: Option<Vec<f64>>,
    n_lat: usize,
    n_lon: usize,
    /// Calendar year of the first mask step (always a January)
    start_year: i32,
}

/// Counts reported after masking one member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaskStats {
    /// Cells newly set to missing by the mask
    pub masked_cells: usize,
    /// Time steps outside the mask's coverage, set entirely missing
    pub uncovered_steps: usize,
}

impl ValidityMask {
    pub fn new(
        missing: Vec<bool>,
        n_time: usize,
        levels: Option<Vec<f64>>,
        n_lat: usize,
        n_lon: usize,
        start_year: i32,
    ) -> Result<Self> {
        let n_levels = levels.as_ref().map(|l| l.len()).unwrap_or(1);
        let expected = n_time * n_levels * n_lat * n_lon;
        if missing.len() != expected {
            return Err(GridProcessorError::mask_shape(format!(
                "mask holds {} cells, dimensions imply {}",
                missing.len(),
                expected
            )));
        }
        Ok(Self {
            missing,
            n_time,
            levels,
            n_lat,
            n_lon,
            start_year,
        })
    }

    /// Mask of the missing cells of a reference field.
    pub fn from_field(field: &Field, start_year: i32) -> Result<Self> {
        Self::new(
            field.values.iter().map(|v| v.is_nan()).collect(),
            field.n_time,
            field.levels.as_ref().map(normalize_to_hpa),
            field.lat.len(),
            field.lon.len(),
            start_year,
        )
    }

    pub fn n_time(&self) -> usize {
        self.n_time
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// Last calendar year the mask covers.
    pub fn end_year(&self) -> i32 {
        self.start_year + (self.n_time / 12) as i32 - 1
    }

    fn step_len(&self) -> usize {
        self.levels.as_ref().map(|l| l.len()).unwrap_or(1) * self.n_lat * self.n_lon
    }

    /// Mask step aligned with the first month of `window`; may lie outside the mask.
    fn window_offset(&self, window: &TimeWindow) -> i64 {
        (window.start_year - self.start_year) as i64 * 12
    }

    /// Mask time indices covering `window`, clipped to the mask's extent.
    pub fn time_range(&self, window: &TimeWindow) -> Range<usize> {
        let offset = self.window_offset(window);
        let n = self.n_time as i64;
        let start = offset.clamp(0, n);
        let end = (offset + window.requested_months() as i64).clamp(start, n);
        start as usize..end as usize
    }

    fn check_shape(&self, field: &Field) -> Result<()> {
        if field.lat.len() != self.n_lat || field.lon.len() != self.n_lon {
            return Err(GridProcessorError::mask_shape(format!(
                "field grid {}x{} differs from mask grid {}x{}",
                field.lat.len(),
                field.lon.len(),
                self.n_lat,
                self.n_lon
            )));
        }
        match (&field.levels, &self.levels) {
            (None, None) => Ok(()),
            (Some(axis), Some(levels)) => {
                let field_levels = normalize_to_hpa(axis);
                if field_levels.len() != levels.len()
                    || field_levels.iter().zip(levels).any(|(a, b)| (a - b).abs() > 1e-6)
                {
                    return Err(GridProcessorError::mask_shape(format!(
                        "field levels {:?} differ from mask levels {:?}",
                        field_levels, levels
                    )));
                }
                Ok(())
            }
            (field_levels, _) => Err(GridProcessorError::mask_shape(format!(
                "field has {} level axis, mask has {}",
                if field_levels.is_some() { "a" } else { "no" },
                if self.levels.is_some() { "one" } else { "none" }
            ))),
        }
    }

    /// Set every cell the mask marks missing to NaN.
    ///
    /// Field step `t` is aligned with the mask step for month `t` of
    /// `window`. Steps the mask does not cover carry no observation and
    /// become entirely missing.
    pub fn apply(&self, field: &mut Field, window: &TimeWindow) -> Result<MaskStats> {
        self.check_shape(field)?;

        let step_len = self.step_len();
        let offset = self.window_offset(window);
        let mut stats = MaskStats::default();
        if step_len == 0 {
            return Ok(stats);
        }

        for (t, step) in field.values.chunks_mut(step_len).enumerate() {
            let mask_t = offset + t as i64;
            if mask_t < 0 || mask_t >= self.n_time as i64 {
                step.iter_mut().for_each(|v| *v = f32::NAN);
                stats.uncovered_steps += 1;
                continue;
            }

            let start = mask_t as usize * step_len;
            let mask_step = &self.missing[start..start + step_len];
            for (v, &missing) in step.iter_mut().zip(mask_step) {
                if missing && !v.is_nan() {
                    *v = f32::NAN;
                    stats.masked_cells += 1;
                }
            }
        }

        if stats.uncovered_steps > 0 {
            warn!(
                uncovered_steps = stats.uncovered_steps,
                mask_start = self.start_year,
                mask_end = self.end_year(),
                window = %window.label(),
                "Requested window extends beyond the reference mask"
            );
        }
        debug!(masked_cells = stats.masked_cells, "Applied validity mask");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmip_common::LevelAxis;

    fn surface_mask(n_years: usize, start_year: i32) -> ValidityMask {
        // 1x2 grid; the second cell is always missing
        let n_time = n_years * 12;
        let missing = (0..n_time).flat_map(|_| [false, true]).collect();
        ValidityMask::new(missing, n_time, None, 1, 2, start_year).unwrap()
    }

    #[test]
    fn test_time_range() {
        let mask = surface_mask(5, 2000);
        assert_eq!(mask.end_year(), 2004);
        assert_eq!(mask.time_range(&TimeWindow::new(2000, 2004).unwrap()), 0..60);
        assert_eq!(mask.time_range(&TimeWindow::new(2002, 2003).unwrap()), 24..48);
        assert_eq!(mask.time_range(&TimeWindow::new(1998, 2001).unwrap()), 0..24);
        assert_eq!(mask.time_range(&TimeWindow::new(2004, 2010).unwrap()), 48..60);
    }

    #[test]
    fn test_apply_masks_cells() {
        let mask = surface_mask(2, 2000);
        let mut field = Field::new(vec![1.0; 24 * 2], 24, None, vec![0.0], vec![0.0, 1.0]).unwrap();
        let stats = mask.apply(&mut field, &TimeWindow::new(2000, 2001).unwrap()).unwrap();

        assert_eq!(stats.masked_cells, 24);
        assert_eq!(stats.uncovered_steps, 0);
        assert_eq!(field.plane(5, 0)[0], 1.0);
        assert!(field.plane(5, 0)[1].is_nan());
    }

    #[test]
    fn test_apply_uncovered_steps_missing() {
        let mask = surface_mask(1, 2000);
        let mut field = Field::new(vec![1.0; 24 * 2], 24, None, vec![0.0], vec![0.0, 1.0]).unwrap();
        let stats = mask.apply(&mut field, &TimeWindow::new(2000, 2001).unwrap()).unwrap();

        assert_eq!(stats.uncovered_steps, 12);
        assert_eq!(field.plane(11, 0)[0], 1.0);
        assert!(field.plane(12, 0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_apply_rejects_level_mismatch() {
        let mask = ValidityMask::new(vec![false; 12 * 2], 12, Some(vec![850.0, 500.0]), 1, 1, 2000).unwrap();
        let mut field = Field::new(
            vec![1.0; 12 * 2],
            12,
            Some(LevelAxis::new(vec![85000.0, 30000.0], "Pa")),
            vec![0.0],
            vec![0.0],
        )
        .unwrap();
        let err = mask.apply(&mut field, &TimeWindow::new(2000, 2000).unwrap()).unwrap_err();
        assert!(matches!(err, GridProcessorError::MaskShape(_)));
    }

    #[test]
    fn test_apply_accepts_pa_levels_matching_hpa_mask() {
        let mask = ValidityMask::new(vec![false; 12 * 2], 12, Some(vec![850.0, 500.0]), 1, 1, 2000).unwrap();
        let mut field = Field::new(
            vec![1.0; 12 * 2],
            12,
            Some(LevelAxis::new(vec![85000.0, 50000.0], "Pa")),
            vec![0.0],
            vec![0.0],
        )
        .unwrap();
        assert!(mask.apply(&mut field, &TimeWindow::new(2000, 2000).unwrap()).is_ok());
    }
}
