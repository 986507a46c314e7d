//! Observational reference dataset defining the common grid and validity mask.

use std::path::Path;

use cmip_common::{Field, FragmentReader, LevelAxis, VariableSpec};
use tracing::{info, warn};

use crate::error::{GridProcessorError, Result};
use crate::levels::normalize_to_hpa;
use crate::mask::ValidityMask;
use crate::projection::{prime_meridian_split, reverse_rows, shift_to_positive_longitudes, swap_longitude_halves};
use crate::types::TargetGrid;

/// The reference anomaly field, reoriented to the model convention.
///
/// Latitudes ascend south to north and longitudes run 0-360. The time axis
/// is monthly and ends in December of `end_year`.
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    pub grid: TargetGrid,
    pub mask: ValidityMask,
    pub start_year: i32,
    pub end_year: i32,
}

impl ReferenceDataset {
    /// Read the reference field from `path` and reorient it.
    pub fn load(
        reader: &dyn FragmentReader,
        path: &Path,
        spec: &VariableSpec,
        end_year: i32,
    ) -> Result<Self> {
        let data = reader.read(path, spec, None)?;
        let reference = Self::from_field(data.field, end_year)?;
        info!(
            path = %path.display(),
            lat = reference.grid.lat.len(),
            lon = reference.grid.lon.len(),
            levels = reference.grid.pressure_levels.len(),
            start_year = reference.start_year,
            end_year = reference.end_year,
            "Loaded reference dataset"
        );
        Ok(reference)
    }

    /// Build the target grid and mask from an already-read reference field.
    pub fn from_field(field: Field, end_year: i32) -> Result<Self> {
        let Field {
            mut values,
            n_time,
            levels,
            mut lat,
            mut lon,
        } = field;

        if lat.is_empty() || lon.is_empty() {
            return Err(GridProcessorError::invalid_grid("reference grid has no cells"));
        }

        if lat.len() > 1 && lat[1] < lat[0] {
            values = reverse_rows(&values, lat.len(), lon.len());
            lat.reverse();
        }

        let split = prime_meridian_split(&lon);
        if split > 0 {
            values = swap_longitude_halves(&values, lon.len(), split);
            lon = shift_to_positive_longitudes(&lon, split);
        }

        if n_time % 12 != 0 {
            warn!(n_time, "Reference time axis is not a whole number of years");
        }
        let start_year = end_year - (n_time / 12) as i32 + 1;

        let levels = levels.map(|axis| LevelAxis::new(normalize_to_hpa(&axis), "hPa"));
        let pressure_levels = levels.as_ref().map(|l| l.values.clone()).unwrap_or_default();
        let field = Field::new(values, n_time, levels, lat, lon)?;

        let mask = ValidityMask::from_field(&field, start_year)?;
        let grid = TargetGrid::new(field.lat, field.lon, pressure_levels);

        Ok(Self {
            grid,
            mask,
            start_year,
            end_year,
        })
    }
}
