//! The per-member assembly pipeline.
//!
//! For every located member: check the destination, resolve fragments
//! (with the continuation experiment when the window passes the historical
//! cutoff), load and stitch, regrid and mask if configured, reduce, write.
//! Member failures are recorded and the run moves on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use cmip_common::{
    Dimensionality, EnsembleMember, FileFragment, FragmentReader, GlobalAttributes, MemberKey,
    OutputSeries, SeriesWriter, TimeWindow,
};
use grid_processor::{
    field_global_mean, GridHarmonizer, GridProcessorError, ReferenceDataset, ValidityMask,
};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::archive::ArchiveLocator;
use crate::config::AssemblyConfig;
use crate::error::{AssemblyError, Result, SkipReason};
use crate::loader::{LoadedSeries, TimeSeriesLoader};
use crate::output::{history_entry, time_coordinate, OutputAction, OutputWriter, COMMON_GRID};
use crate::resolver::FileSetResolver;

/// How one member ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MemberStatus {
    Written {
        n_time: usize,
        fragments: usize,
        temporal_mismatch: bool,
    },
    AlreadyPresent,
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberOutcome {
    pub model: String,
    pub variant: String,
    pub grid: String,
    pub version: String,
    pub output: PathBuf,
    #[serde(flatten)]
    pub status: MemberStatus,
}

/// Outcome of every member the run considered, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<MemberOutcome>,
}

impl RunReport {
    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, MemberStatus::Written { .. }))
    }

    pub fn already_present(&self) -> usize {
        self.count(|s| matches!(s, MemberStatus::AlreadyPresent))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, MemberStatus::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&MemberStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Reference grid state shared read-only by all members.
struct Regridding {
    harmonizer: GridHarmonizer,
    mask: Option<ValidityMask>,
}

/// Drives the assembly of every member matched by an [`AssemblyConfig`].
pub struct PipelineDriver<'a> {
    config: &'a AssemblyConfig,
    reader: &'a dyn FragmentReader,
    writer: &'a dyn SeriesWriter,
    locator: ArchiveLocator,
    resolver: FileSetResolver,
    regridding: Option<Regridding>,
}

impl<'a> PipelineDriver<'a> {
    /// Validate the configuration and, when regridding, load the reference
    /// dataset. Failures here abort the run.
    pub fn new(
        config: &'a AssemblyConfig,
        reader: &'a dyn FragmentReader,
        writer: &'a dyn SeriesWriter,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| AssemblyError::InvalidConfig(format!("{e:#}")))?;

        let regridding = match (&config.reference, config.interpolate) {
            (Some(reference), true) => {
                let dataset = ReferenceDataset::load(
                    reader,
                    &reference.path,
                    &reference.variable_spec(),
                    reference.end_year,
                )?;
                let harmonizer = GridHarmonizer::new(dataset.grid, config.interpolation)?;
                Some(Regridding {
                    harmonizer,
                    mask: config.mask.then_some(dataset.mask),
                })
            }
            _ => None,
        };

        Ok(Self {
            config,
            reader,
            writer,
            locator: ArchiveLocator::new(&config.archive_root),
            resolver: FileSetResolver::new(config.max_fragments),
            regridding,
        })
    }

    /// Process every matching member.
    ///
    /// Only run-level failures (an unreadable archive root) are returned as
    /// errors; member failures are recorded in the report.
    pub fn run(&self) -> Result<RunReport> {
        let window = self.config.window()?;
        let members = self.locator.locate(&self.config.selector())?;
        if members.is_empty() {
            info!(
                experiment = %self.config.experiment,
                variable = %self.config.variable,
                "No ensemble members match the selection"
            );
            return Ok(RunReport::default());
        }

        let continuations = if self.config.needs_continuation() {
            self.continuation_index()?
        } else {
            HashMap::new()
        };

        let output = OutputWriter::new(self.writer, &self.config.output_root, self.config.overwrite);
        let mut expected_dims: Option<Dimensionality> = None;
        let mut report = RunReport::default();

        for member in &members {
            let key = member.key();
            let _span = info_span!(
                "member",
                model = %key.model,
                variant = %key.variant,
                grid = %member.grid
            )
            .entered();

            let path = output.path_for(member, &window, self.regridding.is_some());
            let status = if output.action(&path) == OutputAction::Keep {
                info!(path = %path.display(), "This file already exists, skipping");
                MemberStatus::AlreadyPresent
            } else {
                let result = self.process_member(
                    member,
                    &window,
                    &continuations,
                    &mut expected_dims,
                    &output,
                    &path,
                );
                match result {
                    Ok(status) => status,
                    Err(e) => {
                        let reason = e.into_skip_reason();
                        warn!(reason = %reason, "Skipping member");
                        MemberStatus::Skipped { reason }
                    }
                }
            };

            report.outcomes.push(MemberOutcome {
                model: member.model.clone(),
                variant: member.variant.clone(),
                grid: member.grid.clone(),
                version: member.version.clone(),
                output: path,
                status,
            });
        }

        info!(
            members = report.outcomes.len(),
            written = report.written(),
            already_present = report.already_present(),
            skipped = report.skipped(),
            "Assembly run complete"
        );
        Ok(report)
    }

    /// Continuation members indexed by model and variant.
    fn continuation_index(&self) -> Result<HashMap<MemberKey, Vec<EnsembleMember>>> {
        let selector = self.config.continuation_selector();
        let mut index: HashMap<MemberKey, Vec<EnsembleMember>> = HashMap::new();
        for member in self.locator.locate(&selector)? {
            index.entry(member.key()).or_default().push(member);
        }
        Ok(index)
    }

    /// Earliest continuation fragment for `member`, preferring the same grid.
    fn continuation_for(
        &self,
        member: &EnsembleMember,
        continuations: &HashMap<MemberKey, Vec<EnsembleMember>>,
    ) -> Result<FileFragment> {
        let candidates = continuations
            .get(&member.key())
            .ok_or(SkipReason::ContinuationMissing)?;
        let continuation = candidates
            .iter()
            .find(|c| c.grid == member.grid)
            .or_else(|| candidates.first())
            .ok_or(SkipReason::ContinuationMissing)?;

        let fragment = FileSetResolver::continuation_fragment(continuation)?
            .ok_or(SkipReason::ContinuationMissing)?;
        debug!(
            experiment = %continuation.experiment,
            version = %continuation.version,
            fragment = %fragment.path.display(),
            "Appending continuation fragment"
        );
        Ok(fragment)
    }

    fn process_member(
        &self,
        member: &EnsembleMember,
        window: &TimeWindow,
        continuations: &HashMap<MemberKey, Vec<EnsembleMember>>,
        expected_dims: &mut Option<Dimensionality>,
        output: &OutputWriter<'_>,
        path: &Path,
    ) -> Result<MemberStatus> {
        let continuation = if self.config.needs_continuation() {
            Some(self.continuation_for(member, continuations)?)
        } else {
            None
        };

        let set = self.resolver.resolve(member, window, continuation)?;
        let loader = TimeSeriesLoader::new(self.reader, self.config.variable_spec());
        let loaded = loader.load(&set, window)?;
        check_metadata(member, &loaded.attributes);

        let dims = loaded.field.dimensionality();
        match *expected_dims {
            Some(expected) if expected != dims => {
                return Err(SkipReason::DimensionalityMismatch {
                    expected,
                    found: dims,
                }
                .into());
            }
            Some(_) => {}
            None => *expected_dims = Some(dims),
        }

        let LoadedSeries {
            mut field,
            attributes,
            requested_months,
        } = loaded;
        let temporal_mismatch = field.n_time != requested_months;

        if let Some(regridding) = &self.regridding {
            field = regridding
                .harmonizer
                .harmonize(&field)
                .map_err(harmonize_failure)?;

            if let Some(mask) = &regridding.mask {
                let stats = mask.apply(&mut field, window).map_err(|e| SkipReason::MaskFailure {
                    message: e.to_string(),
                })?;
                debug!(
                    masked_cells = stats.masked_cells,
                    uncovered_steps = stats.uncovered_steps,
                    "Masked member"
                );
            }
        }

        let global_mean: Option<Vec<f64>> = self.config.global_mean.then(|| {
            field_global_mean(&field, self.config.mask)
                .into_iter()
                .map(|m| m.unwrap_or(f64::NAN))
                .collect()
        });

        let (time, time_units) = time_coordinate(field.n_time, window);
        let series = OutputSeries {
            variable: &self.config.variable,
            field: &field,
            time,
            time_units,
            global_mean: global_mean.as_deref(),
            history: history_entry(Utc::now()),
            attributes: GlobalAttributes {
                source_id: Some(member.model.clone()),
                variant_label: Some(member.variant.clone()),
                parent_source_id: attributes.parent_source_id,
                grid_label: Some(if self.regridding.is_some() {
                    COMMON_GRID.to_string()
                } else {
                    member.grid.clone()
                }),
            },
        };

        if !output.write(path, &series)? {
            return Ok(MemberStatus::AlreadyPresent);
        }

        Ok(MemberStatus::Written {
            n_time: field.n_time,
            fragments: set.fragments.len(),
            temporal_mismatch,
        })
    }
}

fn harmonize_failure(e: GridProcessorError) -> SkipReason {
    match e {
        GridProcessorError::LevelLookup { level, .. } => SkipReason::LevelLookupFailure { level },
        other => SkipReason::HarmonizeFailure {
            message: other.to_string(),
        },
    }
}

/// Warn when a file's own attributes disagree with its archive location.
fn check_metadata(member: &EnsembleMember, attributes: &GlobalAttributes) {
    if let Some(source_id) = &attributes.source_id {
        if source_id != &member.model {
            warn!(source_id = %source_id, model = %member.model, "source_id differs from archive path");
        }
    }
    if let Some(variant_label) = &attributes.variant_label {
        if variant_label != &member.variant {
            warn!(
                variant_label = %variant_label,
                variant = %member.variant,
                "variant_label differs from archive path"
            );
        }
    }
}
