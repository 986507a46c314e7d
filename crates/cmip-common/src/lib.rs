//! Common types shared across the CMIP time-series assembly workspace.

pub mod error;
pub mod field;
pub mod fragment;
pub mod io;
pub mod selector;
pub mod time;

pub use error::{CmipError, CmipResult};
pub use field::{Dimensionality, Field, LevelAxis};
pub use fragment::FileFragment;
pub use io::{
    clip_time_range, FragmentData, FragmentReader, GlobalAttributes, OutputSeries, SeriesWriter,
    VariableSpec,
};
pub use selector::{
    wildcard_match, DatasetSelector, EnsembleMember, MemberKey, MemberPolicy, WILDCARD,
};
pub use time::{TimeWindow, YearMonth};
