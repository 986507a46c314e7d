//! Assembled series output as NetCDF.
//!
//! Layout:
//!
//! ```text
//! dimensions: time = UNLIMITED, p (4-D only), lat, lon
//! variables:  <var>(time, [p,] lat, lon)   f8
//!             time(time), plev(p), lat(lat), lon(lon)   f8
//!             <var>_globalmean(time[, p])   f8   (optional)
//! global:     history, source_id, variant_label, parent_source_id, grid_label
//! ```

use std::path::Path;

use cmip_common::{CmipResult, OutputSeries, SeriesWriter};
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};

/// Value written in place of missing cells.
pub const OUTPUT_FILL_VALUE: f64 = 1.0e20;

/// [`SeriesWriter`] producing NetCDF-4 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfSeriesWriter;

impl SeriesWriter for NetcdfSeriesWriter {
    fn write(&self, path: &Path, series: &OutputSeries<'_>) -> CmipResult<()> {
        write_series(path, series).map_err(|e| e.into_write(path))
    }
}

/// Create (or clobber) `path` and write `series` into it.
pub fn write_series(path: &Path, series: &OutputSeries<'_>) -> NetCdfResult<()> {
    let field = series.field;
    if series.time.len() != field.n_time {
        return Err(NetCdfError::InvalidFormat(format!(
            "time coordinate has {} values for {} steps",
            series.time.len(),
            field.n_time
        )));
    }

    if let Some(means) = series.global_mean {
        if means.len() != field.n_time * field.n_levels() {
            return Err(NetCdfError::InvalidFormat(format!(
                "global mean has {} values for {} steps of {} levels",
                means.len(),
                field.n_time,
                field.n_levels()
            )));
        }
    }

    let mut file = netcdf::create(path)?;

    file.add_unlimited_dimension("time")?;
    if let Some(levels) = &field.levels {
        file.add_dimension("p", levels.len())?;
    }
    file.add_dimension("lat", field.lat.len())?;
    file.add_dimension("lon", field.lon.len())?;

    let data_dims: &[&str] = if field.levels.is_some() {
        &["time", "p", "lat", "lon"]
    } else {
        &["time", "lat", "lon"]
    };

    {
        let mut var = file.add_variable::<f64>(series.variable, data_dims)?;
        var.put_attribute("_FillValue", OUTPUT_FILL_VALUE)?;
    }

    {
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        time_var.put_attribute("units", series.time_units.as_str())?;
        time_var.put_attribute("axis", "T")?;
    }

    if let Some(levels) = &field.levels {
        let mut plev = file.add_variable::<f64>("plev", &["p"])?;
        plev.put_attribute("units", levels.units.as_str())?;
        plev.put_attribute("positive", "down")?;
        plev.put_values(&levels.values, ..)?;
    }

    {
        let mut lat = file.add_variable::<f64>("lat", &["lat"])?;
        lat.put_attribute("units", "degrees_north")?;
        lat.put_values(&field.lat, ..)?;
    }

    {
        let mut lon = file.add_variable::<f64>("lon", &["lon"])?;
        lon.put_attribute("units", "degrees_east")?;
        lon.put_values(&field.lon, ..)?;
    }

    let mean_name = format!("{}_globalmean", series.variable);
    if series.global_mean.is_some() {
        let mean_dims: &[&str] = if field.levels.is_some() {
            &["time", "p"]
        } else {
            &["time"]
        };
        let mut mean = file.add_variable::<f64>(&mean_name, mean_dims)?;
        mean.put_attribute("_FillValue", OUTPUT_FILL_VALUE)?;
        mean.put_attribute("cell_methods", "area: mean (cos-latitude weighted)")?;
    }

    file.add_attribute("history", series.history.as_str())?;
    if let Some(source_id) = &series.attributes.source_id {
        file.add_attribute("source_id", source_id.as_str())?;
    }
    if let Some(variant) = &series.attributes.variant_label {
        file.add_attribute("variant_label", variant.as_str())?;
    }
    if let Some(parent) = &series.attributes.parent_source_id {
        file.add_attribute("parent_source_id", parent.as_str())?;
    }
    if let Some(grid) = &series.attributes.grid_label {
        file.add_attribute("grid_label", grid.as_str())?;
    }

    // Steps are written one at a time so the unlimited dimension grows with
    // the data and only one f64 step is held at once.
    for t in 0..field.n_time {
        let step: Vec<f64> = field.step(t).iter().map(|&v| to_output(v as f64)).collect();

        {
            let mut var = file
                .variable_mut(series.variable)
                .ok_or_else(|| NetCdfError::MissingData(series.variable.to_string()))?;
            if field.levels.is_some() {
                var.put_values(&step, (t, .., .., ..))?;
            } else {
                var.put_values(&step, (t, .., ..))?;
            }
        }

        {
            let mut time_var = file
                .variable_mut("time")
                .ok_or_else(|| NetCdfError::MissingData("time".to_string()))?;
            time_var.put_value(series.time[t], [t])?;
        }
    }

    if let Some(means) = series.global_mean {
        let n_levels = field.n_levels();
        let mut mean = file
            .variable_mut(&mean_name)
            .ok_or_else(|| NetCdfError::MissingData(mean_name.clone()))?;
        for t in 0..field.n_time {
            let row: Vec<f64> = means[t * n_levels..(t + 1) * n_levels]
                .iter()
                .map(|&v| to_output(v))
                .collect();
            if field.levels.is_some() {
                mean.put_values(&row, (t, ..))?;
            } else {
                mean.put_value(row[0], [t])?;
            }
        }
    }

    debug!(
        path = %path.display(),
        variable = series.variable,
        steps = field.n_time,
        "Wrote NetCDF series"
    );

    Ok(())
}

fn to_output(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        OUTPUT_FILL_VALUE
    }
}
