//! Enumeration of ensemble members on the CMIP archive.
//!
//! The archive is laid out as
//! `{root}/{project}/{institution}/{model}/{experiment}/{variant}/{table}/{variable}/{grid}/files/{version}/`.
//! Every selector field is matched against its directory level, and for
//! each member only the lexicographically greatest version is kept.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cmip_common::{wildcard_match, DatasetSelector, EnsembleMember, WILDCARD};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{AssemblyError, Result};

/// Directory holding the version directories below the grid level.
const FILES_DIR: &str = "files";

/// Depth of a version directory below the archive root.
const VERSION_DEPTH: usize = 10;

/// Locates ensemble members matching a [`DatasetSelector`].
#[derive(Debug, Clone)]
pub struct ArchiveLocator {
    root: PathBuf,
}

impl ArchiveLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory patterns for each level below the root.
    fn level_patterns(selector: &DatasetSelector) -> [&str; VERSION_DEPTH] {
        [
            &selector.project,
            WILDCARD,
            &selector.model,
            &selector.experiment,
            &selector.variant,
            &selector.table_id,
            &selector.variable,
            &selector.grid,
            FILES_DIR,
            WILDCARD,
        ]
    }

    /// Every member matching `selector`, newest version each, ordered by
    /// model, variant and grid.
    ///
    /// An empty result is not an error. The root itself must be a readable
    /// directory.
    pub fn locate(&self, selector: &DatasetSelector) -> Result<Vec<EnsembleMember>> {
        if !self.root.is_dir() {
            return Err(AssemblyError::ArchiveRoot(self.root.clone()));
        }

        let patterns = Self::level_patterns(selector);
        let walker = WalkDir::new(&self.root)
            .max_depth(VERSION_DEPTH)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let depth = entry.depth();
                depth == 0
                    || (entry.file_type().is_dir()
                        && entry
                            .file_name()
                            .to_str()
                            .map(|name| wildcard_match(patterns[depth - 1], name))
                            .unwrap_or(false))
            });

        // Keyed by everything but the version so the newest version wins
        let mut newest: BTreeMap<(String, String, String, String, String, String, String), EnsembleMember> =
            BTreeMap::new();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable archive entry");
                    continue;
                }
            };

            if entry.depth() != VERSION_DEPTH {
                continue;
            }
            let Some(member) = self.member_from_version_dir(entry.path()) else {
                continue;
            };
            debug!(path = %entry.path().display(), "Found version directory");

            let key = (
                member.model.clone(),
                member.variant.clone(),
                member.grid.clone(),
                member.institution.clone(),
                member.experiment.clone(),
                member.table_id.clone(),
                member.variable.clone(),
            );
            match newest.get(&key) {
                Some(existing) if existing.version >= member.version => {}
                _ => {
                    newest.insert(key, member);
                }
            }
        }

        let members: Vec<EnsembleMember> = newest.into_values().collect();
        info!(
            project = %selector.project,
            experiment = %selector.experiment,
            model = %selector.model,
            variant = %selector.variant,
            members = members.len(),
            "Located ensemble members"
        );
        Ok(members)
    }

    /// Decode the member identity from a version directory path.
    fn member_from_version_dir(&self, dir: &Path) -> Option<EnsembleMember> {
        let relative = dir.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;

        let [_project, institution, model, experiment, variant, table_id, variable, grid, _files, version] =
            parts.as_slice()
        else {
            return None;
        };

        Some(EnsembleMember {
            institution: institution.to_string(),
            model: model.to_string(),
            experiment: experiment.to_string(),
            variant: variant.to_string(),
            table_id: table_id.to_string(),
            variable: variable.to_string(),
            grid: grid.to_string(),
            version: version.to_string(),
            version_dir: dir.to_path_buf(),
        })
    }
}
