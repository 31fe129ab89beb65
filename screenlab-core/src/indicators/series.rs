//! Compaction and re-expansion of partially defined series.
//!
//! Derived indicators (MACD signal line, Stochastic %D) are computed over the
//! defined values of another indicator only, then mapped back to the
//! positions those values came from.

/// Apply `transform` to the defined entries of `series` and scatter the
/// results back to their original positions.
///
/// `transform` receives the compacted values and must return one entry per
/// compacted value; extra entries are ignored and missing ones stay `None`.
pub fn map_defined<F>(series: &[Option<f64>], transform: F) -> Vec<Option<f64>>
where
    F: FnOnce(&[f64]) -> Vec<Option<f64>>,
{
    let (positions, compacted): (Vec<usize>, Vec<f64>) = series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .unzip();

    let mut result = vec![None; series.len()];
    for (pos, value) in positions.into_iter().zip(transform(&compacted)) {
        result[pos] = value;
    }
    result
}
