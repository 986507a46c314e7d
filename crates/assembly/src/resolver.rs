//! Selection of the fragments covering a time window.

use std::fs;
use std::path::Path;

use cmip_common::{EnsembleMember, FileFragment, TimeWindow};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, SkipReason};

/// Extension of archive fragment files.
const FRAGMENT_EXTENSION: &str = "nc";

/// The fragments of one member to load, in time order, and the offset of
/// the requested window within their concatenation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFileSet {
    pub fragments: Vec<FileFragment>,
    /// Months from the start of the first fragment to the start of the window
    pub date_diff: usize,
}

/// Chooses which files of a member's version directory to read.
#[derive(Debug, Clone)]
pub struct FileSetResolver {
    max_fragments: usize,
}

impl FileSetResolver {
    pub fn new(max_fragments: usize) -> Self {
        Self { max_fragments }
    }

    /// Parse every fragment in `dir`, sorted by start month.
    ///
    /// Files whose names carry no parseable time range are logged and ignored.
    pub fn list_fragments(dir: &Path) -> Result<Vec<FileFragment>> {
        let mut fragments = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FRAGMENT_EXTENSION) {
                continue;
            }
            match FileFragment::from_path(&path) {
                Ok(fragment) => fragments.push(fragment),
                Err(e) => warn!(error = %e, "Ignoring unrecognised fragment"),
            }
        }
        fragments.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.path.cmp(&b.path)));
        Ok(fragments)
    }

    /// Earliest fragment of a continuation member, if it has any.
    pub fn continuation_fragment(member: &EnsembleMember) -> Result<Option<FileFragment>> {
        Ok(Self::list_fragments(&member.version_dir)?.into_iter().next())
    }

    /// Select the fragments of `member` overlapping `window`.
    ///
    /// `continuation` is appended after the member's own fragments before
    /// selection. Members selecting no fragments, or more than the
    /// configured limit, are skipped.
    pub fn resolve(
        &self,
        member: &EnsembleMember,
        window: &TimeWindow,
        continuation: Option<FileFragment>,
    ) -> Result<ResolvedFileSet> {
        let mut candidates = Self::list_fragments(&member.version_dir)?;
        candidates.extend(continuation);
        self.select(candidates, window)
    }

    /// Apply the window selection, fragment limit and offset computation to
    /// an ordered candidate list.
    pub fn select(&self, candidates: Vec<FileFragment>, window: &TimeWindow) -> Result<ResolvedFileSet> {
        let fragments: Vec<FileFragment> = candidates
            .into_iter()
            .filter(|f| f.overlaps(window))
            .collect();

        let Some(first) = fragments.first() else {
            return Err(SkipReason::NoFragments.into());
        };

        if fragments.len() > self.max_fragments {
            warn!(
                fragments = fragments.len(),
                limit = self.max_fragments,
                "Too many fragments selected, skipping member"
            );
            return Err(SkipReason::OversizeSkip {
                fragments: fragments.len(),
                limit: self.max_fragments,
            }
            .into());
        }

        let offset = window.offset_from(first.start);
        if offset < 0 {
            warn!(
                first_fragment = %first.path.display(),
                months = -offset,
                "Data begins after the requested start; reading from the first available month"
            );
        }
        let date_diff = offset.max(0) as usize;

        debug!(
            fragments = fragments.len(),
            date_diff,
            window = %window.label(),
            "Resolved fragment set"
        );
        Ok(ResolvedFileSet {
            fragments,
            date_diff,
        })
    }
}
