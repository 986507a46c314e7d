//! Writes an assembled series with the NetCDF writer and reads it back.

use cmip_common::{
    Field, FragmentReader, GlobalAttributes, LevelAxis, OutputSeries, SeriesWriter, VariableSpec,
};
use netcdf_parser::{NetcdfReader, NetcdfSeriesWriter};
use test_utils::assert_approx_eq;

#[test]
fn test_pressure_level_series_survives_write_and_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ta_Amon_TEST_historical_r1i1p1f1_common_grid_200001-200012.nc");

    let lat = vec![-45.0, 0.0, 45.0];
    let lon = vec![0.0, 90.0, 180.0, 270.0];
    let levels = LevelAxis::new(vec![850.0, 500.0], "hPa");
    let n_time = 3;
    let mut values: Vec<f32> = (0..n_time * 2 * 12).map(|i| 200.0 + i as f32).collect();
    values[5] = f32::NAN;
    let field = Field::new(values.clone(), n_time, Some(levels), lat.clone(), lon.clone()).unwrap();

    let means = vec![1.0, 2.0, 3.0, 4.0, f64::NAN, 6.0];
    let series = OutputSeries {
        variable: "ta",
        field: &field,
        time: vec![0.0, 1.0, 2.0],
        time_units: "months since 2000-01-01".to_string(),
        global_mean: Some(&means),
        history: "test: Modified CMIP6 data".to_string(),
        attributes: GlobalAttributes {
            source_id: Some("TEST".to_string()),
            variant_label: Some("r1i1p1f1".to_string()),
            parent_source_id: Some("TEST-PARENT".to_string()),
            grid_label: Some("common_grid".to_string()),
        },
    };

    NetcdfSeriesWriter.write(&path, &series).unwrap();

    let data = NetcdfReader::new()
        .read(&path, &VariableSpec::cmip("ta"), None)
        .unwrap();

    assert_eq!(data.field.shape(), vec![3, 2, 3, 4]);
    assert_eq!(data.total_time, 3);
    assert_eq!(data.field.lat, lat);
    assert_eq!(data.field.lon, lon);
    let read_levels = data.field.levels.as_ref().unwrap();
    assert_eq!(read_levels.values, vec![850.0, 500.0]);
    assert_eq!(read_levels.units, "hPa");

    assert!(data.field.values[5].is_nan());
    for (i, (&read, &orig)) in data.field.values.iter().zip(values.iter()).enumerate() {
        if i != 5 {
            assert_approx_eq!(read, orig, 1e-6);
        }
    }

    assert_eq!(data.attributes.source_id.as_deref(), Some("TEST"));
    assert_eq!(data.attributes.variant_label.as_deref(), Some("r1i1p1f1"));
    assert_eq!(data.attributes.parent_source_id.as_deref(), Some("TEST-PARENT"));
    assert_eq!(data.attributes.grid_label.as_deref(), Some("common_grid"));
}

#[test]
fn test_surface_series_without_global_mean() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tas.nc");

    let field = Field::new(vec![1.5; 2 * 2 * 2], 2, None, vec![-10.0, 10.0], vec![0.0, 180.0]).unwrap();
    let series = OutputSeries {
        variable: "tas",
        field: &field,
        time: vec![0.0, 1.0],
        time_units: "months since 2000-01-01".to_string(),
        global_mean: None,
        history: "test".to_string(),
        attributes: GlobalAttributes::default(),
    };

    NetcdfSeriesWriter.write(&path, &series).unwrap();
    let data = NetcdfReader::new().read(&path, &VariableSpec::cmip("tas"), None).unwrap();

    assert_eq!(data.field.shape(), vec![2, 2, 2]);
    assert!(data.field.levels.is_none());
    assert!(data.field.values.iter().all(|&v| v == 1.5));
    assert!(data.attributes.source_id.is_none());
    assert!(data.attributes.grid_label.is_none());
}

#[test]
fn test_missing_variable_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tas.nc");
    let field = Field::new(vec![0.0; 4], 1, None, vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
    let series = OutputSeries {
        variable: "tas",
        field: &field,
        time: vec![0.0],
        time_units: "months since 2000-01-01".to_string(),
        global_mean: None,
        history: "test".to_string(),
        attributes: GlobalAttributes::default(),
    };
    NetcdfSeriesWriter.write(&path, &series).unwrap();

    let err = NetcdfReader::new().read(&path, &VariableSpec::cmip("pr"), None);
    assert!(matches!(err, Err(cmip_common::CmipError::Read { .. })));
}

#[test]
fn test_time_range_reads_only_requested_steps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ta.nc");

    let levels = LevelAxis::new(vec![850.0, 500.0], "hPa");
    let values: Vec<f32> = (0..4 * 2 * 4).map(|i| i as f32).collect();
    let field = Field::new(values, 4, Some(levels), vec![-10.0, 10.0], vec![0.0, 180.0]).unwrap();
    let series = OutputSeries {
        variable: "ta",
        field: &field,
        time: vec![0.0, 1.0, 2.0, 3.0],
        time_units: "months since 2000-01-01".to_string(),
        global_mean: None,
        history: "test".to_string(),
        attributes: GlobalAttributes::default(),
    };
    NetcdfSeriesWriter.write(&path, &series).unwrap();

    let reader = NetcdfReader::new();
    let data = reader.read(&path, &VariableSpec::cmip("ta"), Some(1..3)).unwrap();
    assert_eq!(data.total_time, 4);
    assert_eq!(data.field.shape(), vec![2, 2, 2, 2]);
    assert_eq!(data.field.values, field.slice_time(1, 2).values);

    // A range past the end of the file is clipped
    let data = reader.read(&path, &VariableSpec::cmip("ta"), Some(3..10)).unwrap();
    assert_eq!(data.field.n_time, 1);
    assert_eq!(data.field.values[0], 24.0);

    let data = reader.read(&path, &VariableSpec::cmip("ta"), Some(6..10)).unwrap();
    assert_eq!(data.field.n_time, 0);
    assert_eq!(data.total_time, 4);
}
