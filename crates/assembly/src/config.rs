//! Run configuration for the assembly pipeline.
//!
//! Loaded from YAML with `${VAR}` and `${VAR:-default}` environment
//! substitution, then validated before any archive access.

use anyhow::{Context, Result};
use cmip_common::{CmipResult, DatasetSelector, MemberPolicy, TimeWindow, VariableSpec, WILDCARD};
use grid_processor::InterpolationMethod;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Model selector value meaning "every model on the archive".
const ALL_MODELS: &str = "all";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Root of the CMIP archive tree
    pub archive_root: PathBuf,
    /// Directory receiving one output file per member
    pub output_root: PathBuf,
    pub project: String,
    pub experiment: String,
    pub members: MemberPolicy,
    /// Model name, a wildcard pattern, or `all`
    pub model: String,
    pub variable: String,
    pub table_id: String,
    /// Grid label or `*`
    pub grid_label: String,
    pub start_year: i32,
    pub end_year: i32,
    /// Regrid every member onto the reference grid
    pub interpolate: bool,
    pub interpolation: InterpolationMethod,
    /// Apply the reference validity mask (requires `interpolate`)
    pub mask: bool,
    /// Replace existing output files instead of skipping the member
    pub overwrite: bool,
    /// Also write an area-weighted global mean series
    pub global_mean: bool,
    /// Members selecting more fragments than this are skipped
    pub max_fragments: usize,
    pub continuation: ContinuationConfig,
    pub reference: Option<ReferenceConfig>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            archive_root: PathBuf::from("/badc/cmip6/data/CMIP6"),
            output_root: PathBuf::from("./output"),
            project: "CMIP".to_string(),
            experiment: "historical".to_string(),
            members: MemberPolicy::First,
            model: ALL_MODELS.to_string(),
            variable: "ta".to_string(),
            table_id: "Amon".to_string(),
            grid_label: WILDCARD.to_string(),
            start_year: 1979,
            end_year: 2017,
            interpolate: false,
            interpolation: InterpolationMethod::Bilinear,
            mask: false,
            overwrite: false,
            global_mean: false,
            max_fragments: 20,
            continuation: ContinuationConfig::default(),
            reference: None,
        }
    }
}

/// Scenario experiment that extends the historical run past its cutoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuationConfig {
    /// Last year covered by the historical experiment
    pub cutoff_year: i32,
    pub project: String,
    pub experiment: String,
}

impl Default for ContinuationConfig {
    fn default() -> Self {
        Self {
            cutoff_year: 2014,
            project: "ScenarioMIP".to_string(),
            experiment: "ssp245".to_string(),
        }
    }
}

/// Observational dataset defining the common grid and validity mask.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub path: PathBuf,
    pub variable: String,
    pub lat: String,
    pub lon: String,
    pub level: String,
    /// Final year of the reference time axis
    pub end_year: i32,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            variable: "anomalies".to_string(),
            lat: "lat".to_string(),
            lon: "lon".to_string(),
            level: "pressure".to_string(),
            end_year: 2017,
        }
    }
}

impl ReferenceConfig {
    pub fn variable_spec(&self) -> VariableSpec {
        VariableSpec {
            variable: self.variable.clone(),
            lat: self.lat.clone(),
            lon: self.lon.clone(),
            level: self.level.clone(),
        }
    }
}

impl AssemblyConfig {
    /// Load and expand a configuration file.
    ///
    /// The result is not validated so callers can apply overrides first;
    /// [`crate::PipelineDriver::new`] validates before running.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read assembly config from {:?}", path.as_ref()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid assembly config {:?}", path.as_ref()))
    }

    /// Parse configuration from YAML text after `${VAR}` expansion.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;

        serde_yaml::from_str(&expanded).with_context(|| "Failed to parse assembly config YAML")
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.start_year <= self.end_year,
            "start_year {} is after end_year {}",
            self.start_year,
            self.end_year
        );
        anyhow::ensure!(!self.variable.is_empty(), "variable cannot be empty");
        anyhow::ensure!(!self.model.is_empty(), "model cannot be empty");
        anyhow::ensure!(
            !self.archive_root.as_os_str().is_empty(),
            "archive_root cannot be empty"
        );
        anyhow::ensure!(self.max_fragments > 0, "max_fragments must be greater than 0");
        anyhow::ensure!(
            !self.mask || self.interpolate,
            "mask requires interpolate: the mask is defined on the reference grid"
        );
        if self.interpolate {
            let reference = self
                .reference
                .as_ref()
                .context("interpolate requires a reference dataset")?;
            anyhow::ensure!(
                !reference.path.as_os_str().is_empty(),
                "reference.path cannot be empty"
            );
        }
        Ok(())
    }

    pub fn window(&self) -> CmipResult<TimeWindow> {
        TimeWindow::new(self.start_year, self.end_year)
    }

    /// Model directory pattern; `all` selects every model.
    pub fn model_pattern(&self) -> &str {
        if self.model.eq_ignore_ascii_case(ALL_MODELS) {
            WILDCARD
        } else {
            &self.model
        }
    }

    pub fn selector(&self) -> DatasetSelector {
        DatasetSelector {
            project: self.project.clone(),
            experiment: self.experiment.clone(),
            model: self.model_pattern().to_string(),
            variable: self.variable.clone(),
            variant: self.members.variant_pattern().to_string(),
            grid: self.grid_label.clone(),
            table_id: self.table_id.clone(),
        }
    }

    /// Selector for the continuation experiment of the same dataset family.
    pub fn continuation_selector(&self) -> DatasetSelector {
        self.selector()
            .with_experiment(&self.continuation.project, &self.continuation.experiment)
    }

    /// Whether the window reaches past the historical cutoff.
    pub fn needs_continuation(&self) -> bool {
        self.end_year > self.continuation.cutoff_year
    }

    pub fn variable_spec(&self) -> VariableSpec {
        VariableSpec::cmip(self.variable.clone())
    }
}

/// Substitute `${NAME}` and `${NAME:-default}` references in `content`.
///
/// Defaults may contain nested braces. A referenced variable that is unset
/// and has no default is an error.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        let end = closing_brace(body)
            .with_context(|| format!("Unclosed variable substitution: ${{{body}"))?;
        out.push_str(&resolve_reference(&body[..end])?);
        rest = &body[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Offset of the `}` that closes a reference whose body starts `body`.
fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Value of `NAME`, or of `NAME:-default` where an empty value takes the default.
fn resolve_reference(reference: &str) -> Result<String> {
    match reference.split_once(":-") {
        Some((name, default)) => Ok(std::env::var(name.trim())
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default.to_string())),
        None => std::env::var(reference.trim())
            .with_context(|| format!("Environment variable {} not set", reference.trim())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AssemblyConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.project, "CMIP");
        assert_eq!(config.members, MemberPolicy::First);
        assert_eq!(config.start_year, 1979);
        assert_eq!(config.end_year, 2017);
        assert_eq!(config.max_fragments, 20);
        assert_eq!(config.continuation.cutoff_year, 2014);
        assert_eq!(config.continuation.experiment, "ssp245");
        assert!(config.needs_continuation());
    }

    #[test]
    fn test_selector_from_config() {
        let yaml = r#"
model: all
members: all
variable: tas
table_id: Amon
"#;
        let config = AssemblyConfig::from_yaml_str(yaml).unwrap();
        let selector = config.selector();
        assert_eq!(selector.model, "*");
        assert_eq!(selector.variant, "r*i1p*f*");
        assert_eq!(selector.variable, "tas");

        let continuation = config.continuation_selector();
        assert_eq!(continuation.project, "ScenarioMIP");
        assert_eq!(continuation.experiment, "ssp245");
        assert_eq!(continuation.variant, "r*i1p*f*");
    }

    #[test]
    fn test_mask_requires_interpolate() {
        let config = AssemblyConfig::from_yaml_str("mask: true\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(format!("{err:#}").contains("mask requires interpolate"));
    }

    #[test]
    fn test_interpolate_requires_reference() {
        let config = AssemblyConfig::from_yaml_str("interpolate: true\n").unwrap();
        assert!(config.validate().is_err());

        let yaml = r#"
interpolate: true
mask: true
interpolation: nearest
reference:
  path: /data/obs/raobcore15_gridded_2017.nc
"#;
        let config = AssemblyConfig::from_yaml_str(yaml).unwrap();
        config.validate().unwrap();
        let reference = config.reference.unwrap();
        assert_eq!(reference.variable, "anomalies");
        assert_eq!(reference.level, "pressure");
        assert_eq!(config.interpolation, InterpolationMethod::Nearest);
    }

    #[test]
    fn test_rejects_reversed_window() {
        let config = AssemblyConfig::from_yaml_str("start_year: 2000\nend_year: 1990\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_can_be_fixed_before_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assembler.yaml");
        fs::write(&path, "start_year: 2000\nend_year: 1990\n").unwrap();

        let mut config = AssemblyConfig::load(&path).unwrap();
        config.end_year = 2010;
        config.validate().unwrap();
        assert_eq!(config.window().unwrap().requested_months(), 11 * 12);
    }

    #[test]
    fn test_env_expansion() {
        std::env::set_var("ASSEMBLY_TEST_ROOT", "/archive/cmip6");
        let yaml = r#"
archive_root: ${ASSEMBLY_TEST_ROOT}
output_root: ${ASSEMBLY_TEST_UNSET_OUTPUT:-/tmp/assembled}
"#;
        let config = AssemblyConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.archive_root, PathBuf::from("/archive/cmip6"));
        assert_eq!(config.output_root, PathBuf::from("/tmp/assembled"));
    }

    #[test]
    fn test_missing_env_var_is_error() {
        assert!(expand_env_vars("root: ${ASSEMBLY_TEST_DEFINITELY_UNSET}").is_err());
        assert!(expand_env_vars("root: ${UNCLOSED").is_err());
    }

    #[test]
    fn test_default_with_nested_braces() {
        let expanded =
            expand_env_vars("a: ${ASSEMBLY_TEST_UNSET_NESTED:-{x}} b: $HOME c: ${ASSEMBLY_TEST_UNSET_EMPTY:-}")
                .unwrap();
        assert_eq!(expanded, "a: {x} b: $HOME c: ");
    }
}
