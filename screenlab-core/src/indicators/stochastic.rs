//! Stochastic oscillator.
//!
//! %K = (close - lowest low) / (highest high - lowest low) * 100 over `k_period` bars,
//! fixed at 50 when the window has no range.
//! %D = SMA(d_period) over the defined %K values, re-expanded.

use super::series::map_defined;
use super::sma::sma;

#[derive(Debug, Clone, PartialEq)]
pub struct StochasticSeries {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

/// Compute the stochastic oscillator. The three slices must share a length;
/// the shortest one bounds the output.
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> StochasticSeries {
    let n = highs.len().min(lows.len()).min(closes.len());
    let mut k = vec![None; n];

    if k_period > 0 && n >= k_period {
        for i in (k_period - 1)..n {
            let start = i + 1 - k_period;
            let window_highs = &highs[start..=i];
            let window_lows = &lows[start..=i];
            if window_highs
                .iter()
                .chain(window_lows)
                .chain(std::iter::once(&closes[i]))
                .any(|v| !v.is_finite())
            {
                continue;
            }
            let highest = window_highs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let lowest = window_lows.iter().copied().fold(f64::INFINITY, f64::min);
            let range = highest - lowest;
            k[i] = Some(if range == 0.0 {
                50.0
            } else {
                (closes[i] - lowest) / range * 100.0
            });
        }
    }

    let d = map_defined(&k, |compacted| sma(compacted, d_period));
    StochasticSeries { k, d }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn flat_window_gives_50() {
        let flat = [100.0; 5];
        let result = stochastic(&flat, &flat, &flat, 3, 3);
        assert_eq!(result.k[2], Some(50.0));
        assert_eq!(result.k[4], Some(50.0));
        assert_eq!(result.d[4], Some(50.0));
    }

    #[test]
    fn close_at_high_is_100_and_at_low_is_0() {
        let highs = [10.0, 11.0, 12.0, 12.0];
        let lows = [9.0, 10.0, 11.0, 9.0];
        let closes = [9.5, 10.5, 12.0, 9.0];
        let result = stochastic(&highs, &lows, &closes, 3, 1);
        assert_approx(result.k[2].unwrap(), 100.0, DEFAULT_EPSILON);
        assert_approx(result.k[3].unwrap(), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn d_warmup_follows_k_warmup() {
        let highs: Vec<f64> = (0..20).map(|i| 101.0 + (i % 4) as f64).collect();
        let lows: Vec<f64> = (0..20).map(|i| 99.0 - (i % 3) as f64).collect();
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + (i % 5) as f64 * 0.5).collect();
        let result = stochastic(&highs, &lows, &closes, 14, 3);
        assert!(result.k[12].is_none());
        assert!(result.k[13].is_some());
        assert!(result.d[14].is_none());
        assert!(result.d[15].is_some());
        let expected =
            (result.k[13].unwrap() + result.k[14].unwrap() + result.k[15].unwrap()) / 3.0;
        assert_approx(result.d[15].unwrap(), expected, DEFAULT_EPSILON);
    }

    #[test]
    fn k_stays_in_range() {
        let highs: Vec<f64> = (0..50).map(|i| 105.0 + (i as f64).sin() * 3.0).collect();
        let lows: Vec<f64> = highs.iter().map(|h| h - 6.0).collect();
        let closes: Vec<f64> = highs.iter().map(|h| h - 2.5).collect();
        let result = stochastic(&highs, &lows, &closes, 14, 3);
        for v in result.k.iter().flatten() {
            assert!((0.0..=100.0).contains(v));
        }
    }

    #[test]
    fn short_input_is_all_none() {
        let result = stochastic(&[1.0], &[1.0], &[1.0], 14, 3);
        assert_eq!(result.k, vec![None]);
        assert_eq!(result.d, vec![None]);
    }
}
