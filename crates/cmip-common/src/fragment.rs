//! Archive file fragments and the time range encoded in their names.
//!
//! CMIP files carry their covered period as the final underscore-separated
//! token of the filename, e.g.
//! `ta_Amon_CanESM5_historical_r1i1p1f1_gn_185001-201412.nc`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CmipError, CmipResult};
use crate::time::{TimeWindow, YearMonth};

/// One archive file and the months it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFragment {
    pub path: PathBuf,
    pub start: YearMonth,
    pub end: YearMonth,
}

impl FileFragment {
    /// Parse the time range from a fragment path.
    pub fn from_path(path: impl Into<PathBuf>) -> CmipResult<Self> {
        let path = path.into();
        let (start, end) = parse_time_range(&path)?;
        Ok(Self { path, start, end })
    }

    pub fn start_year(&self) -> i32 {
        self.start.year
    }

    pub fn end_year(&self) -> i32 {
        self.end.year
    }

    /// True when any year covered by this fragment lies within `window`.
    pub fn overlaps(&self, window: &TimeWindow) -> bool {
        self.start.year <= window.end_year && self.end.year >= window.start_year
    }

    /// Number of monthly samples this fragment is expected to hold.
    pub fn expected_months(&self) -> usize {
        (self.start.months_until(self.end) + 1) as usize
    }
}

fn parse_time_range(path: &Path) -> CmipResult<(YearMonth, YearMonth)> {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let fail = |reason: &str| CmipError::FragmentName {
        name: name.clone(),
        reason: reason.to_string(),
    };

    let stem = name
        .strip_suffix(".nc")
        .ok_or_else(|| fail("missing .nc extension"))?;
    let (_, range) = stem
        .rsplit_once('_')
        .ok_or_else(|| fail("no time range token"))?;
    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| fail("time range is not of the form YYYYMM-YYYYMM"))?;

    let start = YearMonth::parse_compact(start).ok_or_else(|| fail("malformed start month"))?;
    let end = YearMonth::parse_compact(end).ok_or_else(|| fail("malformed end month"))?;

    if end < start {
        return Err(fail("end month precedes start month"));
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cmip_name() {
        let frag = FileFragment::from_path(
            "/archive/files/d20190429/ta_Amon_CanESM5_historical_r1i1p1f1_gn_185001-201412.nc",
        )
        .unwrap();
        assert_eq!(frag.start, YearMonth::new(1850, 1));
        assert_eq!(frag.end, YearMonth::new(2014, 12));
        assert_eq!(frag.expected_months(), 165 * 12);
    }

    #[test]
    fn test_parse_rejects_reversed_range() {
        let err = FileFragment::from_path("ta_Amon_X_historical_r1i1p1f1_gn_201412-185001.nc");
        assert!(matches!(err, Err(CmipError::FragmentName { .. })));
    }

    #[test]
    fn test_parse_rejects_unencoded_name() {
        assert!(FileFragment::from_path("README.txt").is_err());
        assert!(FileFragment::from_path("ta_Amon_X_fx.nc").is_err());
        assert!(FileFragment::from_path("ta_Amon_X_1850-2014.nc").is_err());
    }

    #[test]
    fn test_overlaps() {
        let window = TimeWindow::new(1979, 2017).unwrap();
        let frag = |s: &str| FileFragment::from_path(format!("ta_Amon_M_e_r1i1p1f1_gn_{s}.nc")).unwrap();

        assert!(frag("197501-198912").overlaps(&window));
        assert!(frag("200501-201712").overlaps(&window));
        assert!(frag("201701-202112").overlaps(&window));
        assert!(frag("185001-201412").overlaps(&window));
        assert!(!frag("185001-197812").overlaps(&window));
        assert!(!frag("201801-210012").overlaps(&window));
    }
}
