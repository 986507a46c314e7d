//! Reading and stitching a member's fragments into one time series.

use std::ops::Range;

use cmip_common::{
    FileFragment, Field, FragmentReader, GlobalAttributes, TimeWindow, VariableSpec,
};
use tracing::{debug, warn};

use crate::error::{Result, SkipReason};
use crate::resolver::ResolvedFileSet;

/// A member's series cut to the requested window.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub field: Field,
    /// Attributes of the first fragment
    pub attributes: GlobalAttributes,
    /// Months the window asked for; `field.n_time` may be shorter
    pub requested_months: usize,
}

impl LoadedSeries {
    /// Whether the series holds fewer or more steps than requested.
    pub fn is_temporal_mismatch(&self) -> bool {
        self.field.n_time != self.requested_months
    }
}

/// Loads resolved fragments through a [`FragmentReader`].
pub struct TimeSeriesLoader<'a> {
    reader: &'a dyn FragmentReader,
    spec: VariableSpec,
}

impl<'a> TimeSeriesLoader<'a> {
    pub fn new(reader: &'a dyn FragmentReader, spec: VariableSpec) -> Self {
        Self { reader, spec }
    }

    /// Read the months of `window` starting at the set's `date_diff` and
    /// join them along time.
    ///
    /// Each fragment is asked only for its share of the window, so months
    /// outside the window are never read. With more than one fragment any
    /// read or merge failure is a concatenation failure for the member.
    pub fn load(&self, set: &ResolvedFileSet, window: &TimeWindow) -> Result<LoadedSeries> {
        let requested_months = window.requested_months();
        let wanted = set.date_diff..set.date_diff + requested_months;

        let (field, attributes, available_months) = match set.fragments.as_slice() {
            [] => return Err(SkipReason::NoFragments.into()),
            [single] => {
                let data = self
                    .reader
                    .read(&single.path, &self.spec, Some(wanted))
                    .map_err(|e| SkipReason::ReadFailure {
                        message: e.to_string(),
                    })?;
                (data.field, data.attributes, data.total_time)
            }
            many => self.load_concatenated(many, wanted)?,
        };

        if field.n_time == 0 {
            return Err(SkipReason::EmptyWindow {
                date_diff: set.date_diff,
                available_months,
            }
            .into());
        }

        let series = LoadedSeries {
            field,
            attributes,
            requested_months,
        };
        if series.is_temporal_mismatch() {
            warn!(
                requested = requested_months,
                actual = series.field.n_time,
                "Not all months are available"
            );
        }
        Ok(series)
    }

    /// Read the part of `wanted` each fragment holds, where `wanted` counts
    /// months from the start of the first fragment.
    fn load_concatenated(
        &self,
        fragments: &[FileFragment],
        wanted: Range<usize>,
    ) -> Result<(Field, GlobalAttributes, usize)> {
        let concat_failure = |message: String| SkipReason::ConcatenationFailure { message };

        let mut attributes = None;
        let mut parts = Vec::with_capacity(fragments.len());
        let mut offset = 0;
        for fragment in fragments {
            if offset >= wanted.end {
                debug!(path = %fragment.path.display(), "Window already complete, fragment not read");
                break;
            }
            let local = wanted.start.saturating_sub(offset)..wanted.end - offset;
            let data = self
                .reader
                .read(&fragment.path, &self.spec, Some(local))
                .map_err(|e| concat_failure(e.to_string()))?;

            if data.total_time != fragment.expected_months() {
                debug!(
                    path = %fragment.path.display(),
                    expected = fragment.expected_months(),
                    actual = data.total_time,
                    "Fragment length differs from its filename range"
                );
            }
            offset += data.total_time;
            attributes.get_or_insert(data.attributes);
            parts.push(data.field);
        }

        let field = Field::concat_time(parts).map_err(|e| concat_failure(e.to_string()))?;
        debug!(
            fragments = fragments.len(),
            n_time = field.n_time,
            "Concatenated fragments"
        );
        Ok((field, attributes.unwrap_or_default(), offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssemblyError;
    use cmip_common::{clip_time_range, CmipError, CmipResult, FragmentData};
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    /// Serves a field whose value at step t is the fragment's start year * 100 + t,
    /// recording the steps handed out for each file.
    #[derive(Default)]
    struct StubReader {
        fail_on: Option<&'static str>,
        served: RefCell<Vec<(String, Range<usize>)>>,
    }

    impl StubReader {
        fn failing_on(name: &'static str) -> Self {
            Self {
                fail_on: Some(name),
                ..Default::default()
            }
        }
    }

    impl FragmentReader for StubReader {
        fn read(
            &self,
            path: &Path,
            _spec: &VariableSpec,
            time: Option<Range<usize>>,
        ) -> CmipResult<FragmentData> {
            let name = path.to_string_lossy();
            if self.fail_on.map(|f| name.contains(f)).unwrap_or(false) {
                return Err(CmipError::read(path, "corrupt"));
            }
            let fragment = FileFragment::from_path(path)?;
            let total = fragment.expected_months();
            let range = clip_time_range(time, total);
            self.served
                .borrow_mut()
                .push((fragment.start.to_string(), range.clone()));

            let values = range
                .clone()
                .map(|t| (fragment.start_year() * 100) as f32 + t as f32)
                .collect();
            Ok(FragmentData {
                field: Field::new(values, range.len(), None, vec![0.0], vec![0.0])?,
                attributes: GlobalAttributes::default(),
                total_time: total,
            })
        }
    }

    fn fragments(ranges: &[&str]) -> Vec<FileFragment> {
        ranges
            .iter()
            .map(|r| FileFragment::from_path(PathBuf::from(format!("ta_Amon_M_historical_r1i1p1f1_gn_{r}.nc"))).unwrap())
            .collect()
    }

    #[test]
    fn test_concatenates_and_slices() {
        let reader = StubReader::default();
        let loader = TimeSeriesLoader::new(&reader, VariableSpec::cmip("ta"));
        let set = ResolvedFileSet {
            fragments: fragments(&["197501-198912", "199001-200412", "200501-201712"]),
            date_diff: 48,
        };
        let series = loader.load(&set, &TimeWindow::new(1979, 2017).unwrap()).unwrap();

        assert_eq!(series.field.n_time, 39 * 12);
        assert!(!series.is_temporal_mismatch());
        // January 1979 is month 48 of the first fragment
        assert_eq!(series.field.values[0], 197548.0);
        // January 1990 is the first month of the second fragment
        assert_eq!(series.field.values[11 * 12], 199000.0);
    }

    #[test]
    fn test_only_window_months_are_read() {
        let reader = StubReader::default();
        let loader = TimeSeriesLoader::new(&reader, VariableSpec::cmip("ta"));
        let set = ResolvedFileSet {
            fragments: fragments(&["185001-201412", "201501-206412"]),
            date_diff: (1979 - 1850) * 12,
        };
        let series = loader.load(&set, &TimeWindow::new(1979, 2017).unwrap()).unwrap();

        assert_eq!(series.field.n_time, 39 * 12);
        assert_eq!(
            *reader.served.borrow(),
            vec![
                ("185001".to_string(), 1548..1980),
                ("201501".to_string(), 0..36),
            ]
        );
        assert_eq!(series.field.values[0], 185000.0 + 1548.0);
        assert_eq!(series.field.values[36 * 12], 201500.0);
    }

    #[test]
    fn test_fragments_past_the_window_are_not_read() {
        let reader = StubReader::default();
        let loader = TimeSeriesLoader::new(&reader, VariableSpec::cmip("ta"));
        let set = ResolvedFileSet {
            fragments: fragments(&["197501-198912", "199001-200412"]),
            date_diff: 48,
        };
        let series = loader.load(&set, &TimeWindow::new(1979, 1985).unwrap()).unwrap();

        assert_eq!(series.field.n_time, 7 * 12);
        assert_eq!(*reader.served.borrow(), vec![("197501".to_string(), 48..132)]);
    }

    #[test]
    fn test_short_series_is_mismatch_not_error() {
        let reader = StubReader::default();
        let loader = TimeSeriesLoader::new(&reader, VariableSpec::cmip("ta"));
        let set = ResolvedFileSet {
            fragments: fragments(&["197901-201412"]),
            date_diff: 0,
        };
        let series = loader.load(&set, &TimeWindow::new(1979, 2017).unwrap()).unwrap();
        assert_eq!(series.field.n_time, 36 * 12);
        assert!(series.is_temporal_mismatch());
    }

    #[test]
    fn test_read_failure_in_multi_file_set_is_concatenation_failure() {
        let reader = StubReader::failing_on("199001");
        let loader = TimeSeriesLoader::new(&reader, VariableSpec::cmip("ta"));
        let set = ResolvedFileSet {
            fragments: fragments(&["197501-198912", "199001-200412"]),
            date_diff: 0,
        };
        let err = loader.load(&set, &TimeWindow::new(1979, 2000).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::Skip(SkipReason::ConcatenationFailure { .. })
        ));
    }

    #[test]
    fn test_single_file_read_failure() {
        let reader = StubReader::failing_on("197501");
        let loader = TimeSeriesLoader::new(&reader, VariableSpec::cmip("ta"));
        let set = ResolvedFileSet {
            fragments: fragments(&["197501-198912"]),
            date_diff: 0,
        };
        let err = loader.load(&set, &TimeWindow::new(1979, 1980).unwrap()).unwrap_err();
        assert!(matches!(err, AssemblyError::Skip(SkipReason::ReadFailure { .. })));
    }

    #[test]
    fn test_offset_past_end_is_empty_window() {
        let reader = StubReader::default();
        let loader = TimeSeriesLoader::new(&reader, VariableSpec::cmip("ta"));
        let set = ResolvedFileSet {
            fragments: fragments(&["197501-197612"]),
            date_diff: 48,
        };
        let err = loader.load(&set, &TimeWindow::new(1979, 1980).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::Skip(SkipReason::EmptyWindow { date_diff: 48, available_months: 24 })
        ));
    }
}
