//! Monthly time handling for climate model output.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CmipError, CmipResult};

/// A calendar month, as encoded in archive filenames (`YYYYMM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    /// 1-based month
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Parse a six digit `YYYYMM` token.
    pub fn parse_compact(token: &str) -> Option<Self> {
        if token.len() != 6 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year = token[..4].parse().ok()?;
        let month = token[4..].parse().ok()?;
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { year, month })
    }

    /// Months elapsed since year 0, January.
    pub fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(&self, other: YearMonth) -> i64 {
        other.ordinal() - self.ordinal()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

/// An inclusive range of whole years, January of `start_year` to December of `end_year`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_year: i32,
    pub end_year: i32,
}

impl TimeWindow {
    pub fn new(start_year: i32, end_year: i32) -> CmipResult<Self> {
        if end_year < start_year {
            return Err(CmipError::InvalidWindow {
                start: start_year,
                end: end_year,
            });
        }
        Ok(Self {
            start_year,
            end_year,
        })
    }

    /// Number of monthly samples the window spans.
    pub fn requested_months(&self) -> usize {
        ((self.end_year - self.start_year + 1) * 12) as usize
    }

    pub fn contains_year(&self, year: i32) -> bool {
        (self.start_year..=self.end_year).contains(&year)
    }

    /// First month of the window.
    pub fn start(&self) -> YearMonth {
        YearMonth::new(self.start_year, 1)
    }

    /// Months between the start of a series beginning at `series_start` and the
    /// start of this window. Negative when the series begins after the window.
    pub fn offset_from(&self, series_start: YearMonth) -> i64 {
        series_start.months_until(self.start())
    }

    /// Compact label used in output filenames, e.g. `197901-201712`.
    pub fn label(&self) -> String {
        format!("{}01-{}12", self.start_year, self.end_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compact() {
        assert_eq!(YearMonth::parse_compact("185001"), Some(YearMonth::new(1850, 1)));
        assert_eq!(YearMonth::parse_compact("201412"), Some(YearMonth::new(2014, 12)));
        assert_eq!(YearMonth::parse_compact("201413"), None);
        assert_eq!(YearMonth::parse_compact("20141"), None);
        assert_eq!(YearMonth::parse_compact("2014a1"), None);
    }

    #[test]
    fn test_requested_months() {
        let window = TimeWindow::new(1979, 2017).unwrap();
        assert_eq!(window.requested_months(), 39 * 12);
        assert_eq!(TimeWindow::new(2000, 2000).unwrap().requested_months(), 12);
    }

    #[test]
    fn test_invalid_window() {
        assert!(TimeWindow::new(2017, 1979).is_err());
    }

    #[test]
    fn test_offset_from() {
        let window = TimeWindow::new(1979, 2017).unwrap();
        assert_eq!(window.offset_from(YearMonth::new(1979, 1)), 0);
        assert_eq!(window.offset_from(YearMonth::new(1978, 1)), 12);
        assert_eq!(window.offset_from(YearMonth::new(1975, 1)), 48);
        assert_eq!(window.offset_from(YearMonth::new(1980, 1)), -12);
    }

    #[test]
    fn test_label() {
        let window = TimeWindow::new(1979, 2017).unwrap();
        assert_eq!(window.label(), "197901-201712");
    }
}
