//! Output naming, overwrite policy and series persistence.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use cmip_common::{EnsembleMember, OutputSeries, SeriesWriter, TimeWindow};
use tracing::{info, warn};

use crate::error::{Result, SkipReason};

/// Grid token used in output names when members are regridded.
pub const COMMON_GRID: &str = "common_grid";

/// What to do with a member given the state of its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputAction {
    /// Destination absent: write it
    Create,
    /// Destination present and overwrite enabled: replace it
    Replace,
    /// Destination present and overwrite disabled: member is already done
    Keep,
}

/// Output filename of `member` for `window`:
/// `{variable}_{table}_{model}_{experiment}_{variant}_{grid}_{YYYY01-YYYY12}.nc`.
pub fn output_file_name(member: &EnsembleMember, window: &TimeWindow, regridded: bool) -> String {
    let grid = if regridded { COMMON_GRID } else { member.grid.as_str() };
    format!(
        "{}_{}_{}_{}_{}_{}_{}.nc",
        member.variable,
        member.table_id,
        member.model,
        member.experiment,
        member.variant,
        grid,
        window.label()
    )
}

/// Provenance line stored in the output's `history` attribute.
pub fn history_entry(now: DateTime<Utc>) -> String {
    format!("{}: Modified CMIP6 data", now.format("%Y-%m-%dT%H:%M:%SZ"))
}

/// Monthly time coordinate `0..n` and its units.
pub fn time_coordinate(n_time: usize, window: &TimeWindow) -> (Vec<f64>, String) {
    (
        (0..n_time).map(|t| t as f64).collect(),
        format!("months since {}-01-01", window.start_year),
    )
}

/// Writes member series below an output root, honouring the overwrite policy.
pub struct OutputWriter<'a> {
    writer: &'a dyn SeriesWriter,
    root: PathBuf,
    overwrite: bool,
}

impl<'a> OutputWriter<'a> {
    pub fn new(writer: &'a dyn SeriesWriter, root: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            writer,
            root: root.into(),
            overwrite,
        }
    }

    pub fn path_for(&self, member: &EnsembleMember, window: &TimeWindow, regridded: bool) -> PathBuf {
        self.root.join(output_file_name(member, window, regridded))
    }

    pub fn action(&self, path: &Path) -> OutputAction {
        match (path.exists(), self.overwrite) {
            (false, _) => OutputAction::Create,
            (true, true) => OutputAction::Replace,
            (true, false) => OutputAction::Keep,
        }
    }

    /// Write `series` to `path`, replacing any previous file when allowed.
    ///
    /// Returns `false` without touching the file when it exists and
    /// overwriting is disabled. The series is written to a sibling
    /// temporary file first, so a failed write leaves any previous output
    /// in place.
    pub fn write(&self, path: &Path, series: &OutputSeries<'_>) -> Result<bool> {
        let write_failure = |message: String| SkipReason::WriteFailure { message };

        match self.action(path) {
            OutputAction::Keep => {
                info!(path = %path.display(), "This file already exists, skipping");
                return Ok(false);
            }
            OutputAction::Replace => {
                info!(path = %path.display(), "This file already exists, overwriting");
            }
            OutputAction::Create => {}
        }

        fs::create_dir_all(&self.root).map_err(|e| write_failure(e.to_string()))?;

        let staging = staging_path(path);
        if let Err(e) = self.writer.write(&staging, series) {
            discard(&staging);
            return Err(write_failure(e.to_string()).into());
        }
        if let Err(e) = fs::rename(&staging, path) {
            discard(&staging);
            return Err(write_failure(e.to_string()).into());
        }

        info!(path = %path.display(), n_time = series.field.n_time, "Wrote member series");
        Ok(true)
    }
}

/// Temporary sibling of `path` that a series is written to before it replaces `path`.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn discard(staging: &Path) {
    if staging.exists() {
        if let Err(e) = fs::remove_file(staging) {
            warn!(path = %staging.display(), error = %e, "Failed to remove partial output");
        }
    }
}
