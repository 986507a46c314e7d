//! Regridding of native model fields onto the common target grid.

use cmip_common::{Field, LevelAxis};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::{GridProcessorError, Result};
use crate::levels::{match_levels, normalize_to_hpa};
use crate::projection::RegridPlan;
use crate::types::{InterpolationMethod, TargetGrid};

/// Moves fields from their native grid onto one shared [`TargetGrid`].
///
/// Each time step and level is interpolated independently. For fields with
/// a level axis only the target's pressure levels are kept, matched by
/// exact value after normalising the native axis to hPa.
#[derive(Debug, Clone)]
pub struct GridHarmonizer {
    target: TargetGrid,
    method: InterpolationMethod,
}

impl GridHarmonizer {
    pub fn new(target: TargetGrid, method: InterpolationMethod) -> Result<Self> {
        if target.lat.is_empty() || target.lon.is_empty() {
            return Err(GridProcessorError::invalid_grid("target grid has no cells"));
        }
        Ok(Self { target, method })
    }

    /// Interpolate `field` onto the target grid.
    #[instrument(skip(self, field), fields(n_time = field.n_time, method = %self.method))]
    pub fn harmonize(&self, field: &Field) -> Result<Field> {
        let plan = RegridPlan::new(
            &field.lat,
            &field.lon,
            &self.target.lat,
            &self.target.lon,
            self.method,
        )?;

        // Resolve the level subset up front so a missing level fails before
        // any interpolation work is done.
        let (level_indices, out_levels) = match &field.levels {
            Some(axis) => {
                if self.target.pressure_levels.is_empty() {
                    return Err(GridProcessorError::NoTargetLevels);
                }
                let native_hpa = normalize_to_hpa(axis);
                let indices = match_levels(&native_hpa, &self.target.pressure_levels)?;
                (
                    indices,
                    Some(LevelAxis::new(self.target.pressure_levels.clone(), "hPa")),
                )
            }
            None => (vec![0], None),
        };

        let dst_plane = plan.dst_len();
        let dst_step = dst_plane * level_indices.len();
        let mut values = vec![f32::NAN; field.n_time * dst_step];

        values
            .par_chunks_mut(dst_step)
            .enumerate()
            .for_each(|(t, step)| {
                for (out_k, &native_k) in level_indices.iter().enumerate() {
                    let out = &mut step[out_k * dst_plane..(out_k + 1) * dst_plane];
                    plan.apply(field.plane(t, native_k), out);
                }
            });

        debug!(
            native_shape = ?field.shape(),
            levels = level_indices.len(),
            "Harmonized field onto target grid"
        );

        Ok(Field::new(
            values,
            field.n_time,
            out_levels,
            self.target.lat.clone(),
            self.target.lon.clone(),
        )?)
    }
}
