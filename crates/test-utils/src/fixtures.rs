//! On-disk archive fixtures.
//!
//! Builds a temporary directory tree following the CMIP6 archive layout:
//!
//! ```text
//! {root}/{project}/{institution}/{model}/{experiment}/{variant}/{table}/{variable}/{grid}/files/{version}/{file}.nc
//! ```
//!
//! Files are created empty; tests pair the tree with an in-memory reader.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Identity of one member directory in the fixture archive.
#[derive(Debug, Clone)]
pub struct MemberSpec {
    pub project: String,
    pub institution: String,
    pub model: String,
    pub experiment: String,
    pub variant: String,
    pub table: String,
    pub variable: String,
    pub grid: String,
}

impl MemberSpec {
    /// A `CMIP`/`Amon`/`ta`/`gn` member of `model`.
    pub fn new(model: &str, experiment: &str, variant: &str) -> Self {
        Self {
            project: "CMIP".to_string(),
            institution: "TEST-INST".to_string(),
            model: model.to_string(),
            experiment: experiment.to_string(),
            variant: variant.to_string(),
            table: "Amon".to_string(),
            variable: "ta".to_string(),
            grid: "gn".to_string(),
        }
    }

    pub fn project(mut self, project: &str) -> Self {
        self.project = project.to_string();
        self
    }

    pub fn variable(mut self, variable: &str) -> Self {
        self.variable = variable.to_string();
        self
    }

    pub fn grid(mut self, grid: &str) -> Self {
        self.grid = grid.to_string();
        self
    }

    /// Archive filename for a `YYYYMM-YYYYMM` range.
    pub fn file_name(&self, range: &str) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}_{}.nc",
            self.variable, self.table, self.model, self.experiment, self.variant, self.grid, range
        )
    }
}

/// A temporary archive root. Removed when dropped.
pub struct ArchiveFixture {
    dir: TempDir,
}

impl ArchiveFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create fixture archive"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// The `files/` directory holding the version directories of `spec`.
    pub fn files_dir(&self, spec: &MemberSpec) -> PathBuf {
        self.root()
            .join(&spec.project)
            .join(&spec.institution)
            .join(&spec.model)
            .join(&spec.experiment)
            .join(&spec.variant)
            .join(&spec.table)
            .join(&spec.variable)
            .join(&spec.grid)
            .join("files")
    }

    /// Create `version` for `spec` containing one empty file per range.
    /// Returns the created file paths in the given order.
    pub fn add_files(&self, spec: &MemberSpec, version: &str, ranges: &[&str]) -> Vec<PathBuf> {
        let dir = self.files_dir(spec).join(version);
        fs::create_dir_all(&dir).expect("create version directory");
        ranges
            .iter()
            .map(|range| {
                let path = dir.join(spec.file_name(range));
                fs::write(&path, b"").expect("create fragment file");
                path
            })
            .collect()
    }

    /// A scratch directory for outputs, inside the fixture root.
    pub fn output_dir(&self) -> PathBuf {
        let dir = self.root().join("output");
        fs::create_dir_all(&dir).expect("create output directory");
        dir
    }
}

impl Default for ArchiveFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_files_layout() {
        let archive = ArchiveFixture::new();
        let spec = MemberSpec::new("CanESM5", "historical", "r1i1p1f1");
        let files = archive.add_files(&spec, "v20190429", &["185001-201412"]);

        assert_eq!(files.len(), 1);
        assert!(files[0].exists());
        assert!(files[0].ends_with(
            "CMIP/TEST-INST/CanESM5/historical/r1i1p1f1/Amon/ta/gn/files/v20190429/ta_Amon_CanESM5_historical_r1i1p1f1_gn_185001-201412.nc"
        ));
    }
}
