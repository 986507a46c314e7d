//! In-memory gridded fields laid out as `[time, (level,) lat, lon]`.

use serde::{Deserialize, Serialize};

use crate::error::{CmipError, CmipResult};

/// Sentinel stored for missing or masked cells.
pub const MISSING: f32 = f32::NAN;

/// Vertical coordinate of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelAxis {
    pub values: Vec<f64>,
    /// Units string as found in the source, e.g. `Pa` or `hPa`
    pub units: String,
}

impl LevelAxis {
    pub fn new(values: Vec<f64>, units: impl Into<String>) -> Self {
        Self {
            values,
            units: units.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Whether a field carries a vertical level axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimensionality {
    /// `[time, lat, lon]`
    Surface,
    /// `[time, level, lat, lon]`
    Levels,
}

/// A time series of 2-D or 3-D grids stored row-major in one flat buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub values: Vec<f32>,
    pub n_time: usize,
    pub levels: Option<LevelAxis>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
}

impl Field {
    /// Build a field, checking the buffer length against the coordinates.
    pub fn new(
        values: Vec<f32>,
        n_time: usize,
        levels: Option<LevelAxis>,
        lat: Vec<f64>,
        lon: Vec<f64>,
    ) -> CmipResult<Self> {
        let n_levels = levels.as_ref().map(|l| l.len()).unwrap_or(1);
        let expected = n_time * n_levels * lat.len() * lon.len();
        if values.len() != expected {
            return Err(CmipError::InvalidShape(format!(
                "buffer holds {} values but coordinates imply {} ({} x {} x {} x {})",
                values.len(),
                expected,
                n_time,
                n_levels,
                lat.len(),
                lon.len()
            )));
        }
        Ok(Self {
            values,
            n_time,
            levels,
            lat,
            lon,
        })
    }

    pub fn dimensionality(&self) -> Dimensionality {
        if self.levels.is_some() {
            Dimensionality::Levels
        } else {
            Dimensionality::Surface
        }
    }

    /// Number of vertical levels (1 for surface fields).
    pub fn n_levels(&self) -> usize {
        self.levels.as_ref().map(|l| l.len()).unwrap_or(1)
    }

    /// Cells in one horizontal plane.
    pub fn plane_len(&self) -> usize {
        self.lat.len() * self.lon.len()
    }

    /// Cells in one time step.
    pub fn step_len(&self) -> usize {
        self.n_levels() * self.plane_len()
    }

    /// Dimension lengths in storage order.
    pub fn shape(&self) -> Vec<usize> {
        match &self.levels {
            Some(levels) => vec![self.n_time, levels.len(), self.lat.len(), self.lon.len()],
            None => vec![self.n_time, self.lat.len(), self.lon.len()],
        }
    }

    /// Values of one time step.
    pub fn step(&self, t: usize) -> &[f32] {
        let len = self.step_len();
        &self.values[t * len..(t + 1) * len]
    }

    /// Values of one horizontal plane at time `t` and level index `k`.
    pub fn plane(&self, t: usize, k: usize) -> &[f32] {
        let plane = self.plane_len();
        let start = t * self.step_len() + k * plane;
        &self.values[start..start + plane]
    }

    /// Copy of the time steps `[start, start + len)`, clipped to the available range.
    pub fn slice_time(&self, start: usize, len: usize) -> Field {
        let start = start.min(self.n_time);
        let end = start.saturating_add(len).min(self.n_time);
        let step = self.step_len();
        Field {
            values: self.values[start * step..end * step].to_vec(),
            n_time: end - start,
            levels: self.levels.clone(),
            lat: self.lat.clone(),
            lon: self.lon.clone(),
        }
    }

    /// Join fields along the time axis. All parts must share identical coordinates.
    pub fn concat_time(parts: Vec<Field>) -> CmipResult<Field> {
        let mut iter = parts.into_iter();
        let mut out = iter
            .next()
            .ok_or_else(|| CmipError::InvalidShape("nothing to concatenate".to_string()))?;

        for (index, part) in iter.enumerate() {
            if part.levels != out.levels || part.lat != out.lat || part.lon != out.lon {
                return Err(CmipError::InvalidShape(format!(
                    "part {} has shape {:?} and coordinates incompatible with {:?}",
                    index + 1,
                    part.shape(),
                    out.shape()
                )));
            }
            out.n_time += part.n_time;
            out.values.extend_from_slice(&part.values);
        }

        Ok(out)
    }
}
