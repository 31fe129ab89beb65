//! Simple Moving Average (SMA).
//!
//! Mean of the trailing `period` values.
//! Lookback: period - 1 (first value at index period-1).

/// Compute the SMA of `values`.
///
/// Returns one entry per input; entries without a full window, or whose window
/// holds a non-finite value, are `None`.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];

    if period == 0 || n < period {
        return result;
    }

    for (offset, window) in values.windows(period).enumerate() {
        if window.iter().any(|v| !v.is_finite()) {
            continue;
        }
        let sum: f64 = window.iter().sum();
        result[offset + period - 1] = Some(sum / period as f64);
    }

    result
}
