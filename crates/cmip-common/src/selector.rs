//! Dataset selectors and ensemble member identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Wildcard accepted in selector fields.
pub const WILDCARD: &str = "*";

/// Which ensemble members of each model to include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberPolicy {
    /// Every realization with initialization 1 and any physics/forcing index.
    All,
    /// Only the first realization/initialization/physics combination, any forcing index.
    #[default]
    First,
}

impl MemberPolicy {
    /// Directory pattern for variant labels under this policy.
    pub fn variant_pattern(&self) -> &'static str {
        match self {
            MemberPolicy::All => "r*i1p*f*",
            MemberPolicy::First => "r1i1p1f*",
        }
    }
}

impl std::str::FromStr for MemberPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "first" => Ok(Self::First),
            other => Err(format!("unknown member policy '{}', expected 'all' or 'first'", other)),
        }
    }
}

/// Identifies a logical dataset family on the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSelector {
    pub project: String,
    pub experiment: String,
    /// Model (source) name or `*`
    pub model: String,
    pub variable: String,
    /// Variant label pattern, e.g. `r1i1p1f*`
    pub variant: String,
    /// Grid label or `*`
    pub grid: String,
    /// Table id, e.g. `Amon`
    pub table_id: String,
}

impl DatasetSelector {
    /// The same selector pointed at another project/experiment pair.
    pub fn with_experiment(&self, project: &str, experiment: &str) -> Self {
        Self {
            project: project.to_string(),
            experiment: experiment.to_string(),
            ..self.clone()
        }
    }
}

/// Identity used to pair an ensemble member across experiments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberKey {
    pub model: String,
    pub variant: String,
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model, self.variant)
    }
}

/// One resolved (model, variant) pair and the version directory holding its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleMember {
    pub institution: String,
    pub model: String,
    pub experiment: String,
    pub variant: String,
    pub table_id: String,
    pub variable: String,
    pub grid: String,
    pub version: String,
    pub version_dir: PathBuf,
}

impl EnsembleMember {
    pub fn key(&self) -> MemberKey {
        MemberKey {
            model: self.model.clone(),
            variant: self.variant.clone(),
        }
    }
}

/// Match `name` against a glob-style pattern where `*` matches any run of characters.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while ni < n.len() {
        if pi < p.len() && p[pi] != '*' && p[pi] == n[ni] {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ni;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ni = mark;
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*", "CanESM5"));
        assert!(wildcard_match("CanESM5", "CanESM5"));
        assert!(!wildcard_match("CanESM5", "CanESM5-CanOE"));
        assert!(wildcard_match("r1i1p1f*", "r1i1p1f2"));
        assert!(!wildcard_match("r1i1p1f*", "r10i1p1f1"));
        assert!(wildcard_match("r*i1p*f*", "r10i1p2f1"));
        assert!(!wildcard_match("r*i1p*f*", "r1i2p1f1"));
        assert!(wildcard_match("", ""));
        assert!(!wildcard_match("", "x"));
    }

    #[test]
    fn test_variant_patterns() {
        assert!(wildcard_match(MemberPolicy::First.variant_pattern(), "r1i1p1f1"));
        assert!(!wildcard_match(MemberPolicy::First.variant_pattern(), "r2i1p1f1"));
        assert!(wildcard_match(MemberPolicy::All.variant_pattern(), "r2i1p1f1"));
    }

    #[test]
    fn test_member_policy_from_str() {
        assert_eq!("ALL".parse::<MemberPolicy>().unwrap(), MemberPolicy::All);
        assert_eq!("first".parse::<MemberPolicy>().unwrap(), MemberPolicy::First);
        assert!("some".parse::<MemberPolicy>().is_err());
    }
}
