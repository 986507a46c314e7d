//! Seams between the assembly pipeline and the on-disk container format.
//!
//! The pipeline only needs "read a named variable plus its coordinates" and
//! "write a field plus its coordinates"; `netcdf-parser` provides the NetCDF
//! implementation, tests provide in-memory ones.

use std::ops::Range;
use std::path::Path;

use crate::error::CmipResult;
use crate::field::Field;

/// Names of the variable and coordinate arrays to read from a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSpec {
    pub variable: String,
    pub lat: String,
    pub lon: String,
    pub level: String,
}

impl VariableSpec {
    /// Standard CMIP naming: `lat`, `lon`, `plev`.
    pub fn cmip(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            lat: "lat".to_string(),
            lon: "lon".to_string(),
            level: "plev".to_string(),
        }
    }
}

/// Global attributes describing the provenance of a model file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalAttributes {
    pub source_id: Option<String>,
    pub variant_label: Option<String>,
    pub parent_source_id: Option<String>,
    pub grid_label: Option<String>,
}

/// Contents of one container: the field and its descriptive attributes.
#[derive(Debug, Clone)]
pub struct FragmentData {
    /// The requested time steps of the variable
    pub field: Field,
    pub attributes: GlobalAttributes,
    /// Length of the container's time axis, regardless of how much was read
    pub total_time: usize,
}

impl FragmentData {
    /// Data holding every time step of the container.
    pub fn whole(field: Field, attributes: GlobalAttributes) -> Self {
        Self {
            total_time: field.n_time,
            field,
            attributes,
        }
    }
}

/// Clip a requested time range to a time axis of `n_time` steps.
///
/// `None` selects the whole axis.
pub fn clip_time_range(time: Option<Range<usize>>, n_time: usize) -> Range<usize> {
    match time {
        Some(range) => {
            let end = range.end.min(n_time);
            range.start.min(end)..end
        }
        None => 0..n_time,
    }
}

/// Reads a named variable with its coordinates.
///
/// `time` restricts the read to those steps of the container's time axis,
/// clipped to its length; `None` reads every step. Implementations must
/// replace fill/missing values with [`crate::field::MISSING`].
pub trait FragmentReader {
    fn read(
        &self,
        path: &Path,
        spec: &VariableSpec,
        time: Option<Range<usize>>,
    ) -> CmipResult<FragmentData>;
}

/// A finished series ready to be persisted.
#[derive(Debug, Clone)]
pub struct OutputSeries<'a> {
    pub variable: &'a str,
    pub field: &'a Field,
    /// Time coordinate values, one per step
    pub time: Vec<f64>,
    pub time_units: String,
    /// Area-weighted mean per step (and per level for 4-D fields)
    pub global_mean: Option<&'a [f64]>,
    pub history: String,
    pub attributes: GlobalAttributes,
}

/// Persists an [`OutputSeries`] to a self-describing container.
pub trait SeriesWriter {
    fn write(&self, path: &Path, series: &OutputSeries<'_>) -> CmipResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_time_range() {
        assert_eq!(clip_time_range(None, 24), 0..24);
        assert_eq!(clip_time_range(Some(6..18), 24), 6..18);
        assert_eq!(clip_time_range(Some(12..48), 24), 12..24);
        assert_eq!(clip_time_range(Some(30..40), 24), 24..24);
    }
}
