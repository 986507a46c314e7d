//! Native NetCDF reading using the netcdf library.

use std::ops::Range;
use std::path::Path;
use std::sync::Once;

use cmip_common::{
    clip_time_range, CmipResult, Field, FragmentData, FragmentReader, GlobalAttributes, LevelAxis,
    VariableSpec,
};
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// This function disables that output by calling H5Eset_auto2 with null handlers.
/// It only needs to be called once per process, but is safe to call multiple times.
///
/// **Important**: Call this function early in your program's startup (e.g., in main())
/// before any HDF5/NetCDF operations occur.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// [`FragmentReader`] backed by libnetcdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfReader;

impl NetcdfReader {
    pub fn new() -> Self {
        silence_hdf5_errors();
        Self
    }
}

impl FragmentReader for NetcdfReader {
    fn read(
        &self,
        path: &Path,
        spec: &VariableSpec,
        time: Option<Range<usize>>,
    ) -> CmipResult<FragmentData> {
        read_fragment(path, spec, time).map_err(|e| e.into_read(path))
    }
}

/// Read `spec.variable` and its coordinates from the file at `path`.
///
/// The variable must be `[time, lat, lon]` or `[time, level, lat, lon]`.
/// Only the steps in `time` (clipped to the file) are read from disk.
pub fn read_fragment(
    path: &Path,
    spec: &VariableSpec,
    time: Option<Range<usize>>,
) -> NetCdfResult<FragmentData> {
    let file = netcdf::open(path)?;

    let var = file
        .variable(&spec.variable)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", spec.variable)))?;

    let dims: Vec<(String, usize)> = var
        .dimensions()
        .iter()
        .map(|d| (d.name(), d.len()))
        .collect();

    if dims.len() != 3 && dims.len() != 4 {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} has {} dimensions, expected 3 or 4",
            spec.variable,
            dims.len()
        )));
    }

    let total_time = dims[0].1;
    let time = clip_time_range(time, total_time);
    let n_time = time.len();
    let raw: Vec<f32> = if n_time == 0 {
        Vec::new()
    } else if dims.len() == 4 {
        var.get_values::<f32, _>((time, .., .., ..))?
    } else {
        var.get_values::<f32, _>((time, .., ..))?
    };
    let fills = fill_values(&var);
    let values = normalize_missing(raw, &fills);

    let lat = read_coordinate(&file, &spec.lat)?;
    let lon = read_coordinate(&file, &spec.lon)?;

    let levels = if dims.len() == 4 {
        // Fall back to the dimension's own coordinate variable when the
        // configured level name is absent.
        let name = if file.variable(&spec.level).is_some() {
            spec.level.clone()
        } else {
            dims[1].0.clone()
        };
        let level_var = file
            .variable(&name)
            .ok_or_else(|| NetCdfError::MissingData(format!("{} level coordinate", name)))?;
        let values = level_var.get_values::<f64, _>(..)?;
        let units = string_attr(&level_var, "units").unwrap_or_default();
        Some(LevelAxis::new(values, units))
    } else {
        None
    };

    debug!(
        path = %path.display(),
        variable = %spec.variable,
        dims = ?dims,
        n_time,
        "Read NetCDF variable"
    );

    let field = Field::new(values, n_time, levels, lat, lon)
        .map_err(|e| NetCdfError::InvalidFormat(e.to_string()))?;

    let attributes = GlobalAttributes {
        source_id: global_string_attr(&file, "source_id"),
        variant_label: global_string_attr(&file, "variant_label"),
        parent_source_id: global_string_attr(&file, "parent_source_id"),
        grid_label: global_string_attr(&file, "grid_label"),
    };

    Ok(FragmentData {
        field,
        attributes,
        total_time,
    })
}

/// Replace any value equal to one of `fills`, or non-finite, with the missing sentinel.
pub(crate) fn normalize_missing(mut values: Vec<f32>, fills: &[f32]) -> Vec<f32> {
    for v in values.iter_mut() {
        if !v.is_finite() || fills.iter().any(|f| f == v) {
            *v = cmip_common::field::MISSING;
        }
    }
    values
}

// =============================================================================
// Internal helpers
// =============================================================================

fn read_coordinate(file: &netcdf::File, name: &str) -> NetCdfResult<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} coordinate", name)))?;
    Ok(var.get_values::<f64, _>(..)?)
}

fn fill_values(var: &netcdf::Variable) -> Vec<f32> {
    ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| get_f64_attr(var, name))
        .map(|v| v as f32)
        .collect()
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get f64 attribute.
fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    String::try_from(attr_value).ok()
}

fn global_string_attr(file: &netcdf::File, name: &str) -> Option<String> {
    if !file.attributes().any(|attr| attr.name() == name) {
        return None;
    }
    let attr_value = file.attribute(name)?.value().ok()?;
    String::try_from(attr_value).ok()
}
