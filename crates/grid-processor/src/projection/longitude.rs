//! Longitude and latitude ordering of the observational reference grid.
//!
//! The reference dataset stores longitudes in a -180..180 convention and
//! latitudes north to south; model grids run 0..360 and south to north.

/// Index of the first longitude at or east of the prime meridian.
pub fn prime_meridian_split(lon: &[f64]) -> usize {
    lon.partition_point(|&x| x < 0.0)
}

/// Swap the western and eastern halves of every row of a `[..., lon]` buffer.
///
/// Columns `split..` move to the front, columns `..split` to the back.
pub fn swap_longitude_halves(values: &[f32], n_lon: usize, split: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(values.len());
    for row in values.chunks(n_lon) {
        out.extend_from_slice(&row[split..]);
        out.extend_from_slice(&row[..split]);
    }
    out
}

/// Longitude coordinate matching [`swap_longitude_halves`]: the eastern half
/// followed by the western half shifted by 360°.
pub fn shift_to_positive_longitudes(lon: &[f64], split: usize) -> Vec<f64> {
    lon[split..]
        .iter()
        .copied()
        .chain(lon[..split].iter().map(|x| x + 360.0))
        .collect()
}

/// Reverse the row order of every `[n_rows, n_cols]` plane in a buffer.
pub fn reverse_rows(values: &[f32], n_rows: usize, n_cols: usize) -> Vec<f32> {
    let plane = n_rows * n_cols;
    let mut out = Vec::with_capacity(values.len());
    for block in values.chunks(plane) {
        for row in block.chunks(n_cols).rev() {
            out.extend_from_slice(row);
        }
    }
    out
}
