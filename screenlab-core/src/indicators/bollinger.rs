//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! - Middle: SMA(period)
//! - Upper: middle + mult * stddev(period)
//! - Lower: middle - mult * stddev(period)
//!
//! Uses population stddev (divide by N).
//! Lookback: period - 1.

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

pub fn bollinger(values: &[f64], period: usize, multiplier: f64) -> BollingerBands {
    let n = values.len();
    let mut bands = BollingerBands {
        upper: vec![None; n],
        middle: vec![None; n],
        lower: vec![None; n],
    };

    if period == 0 || n < period {
        return bands;
    }

    for (offset, window) in values.windows(period).enumerate() {
        if window.iter().any(|v| !v.is_finite()) {
            continue;
        }
        let i = offset + period - 1;
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        let half_width = multiplier * variance.sqrt();

        bands.middle[i] = Some(mean);
        bands.upper[i] = Some(mean + half_width);
        bands.lower[i] = Some(mean - half_width);
    }

    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, sma, DEFAULT_EPSILON};

    #[test]
    fn middle_is_sma() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0];
        let bands = bollinger(&closes, 3, 2.0);
        assert_eq!(bands.middle, sma(&closes, 3));
    }

    #[test]
    fn known_population_stddev() {
        // window 10, 11, 12: mean 11, population variance 2/3
        let bands = bollinger(&[10.0, 11.0, 12.0], 3, 2.0);
        let sd = (2.0_f64 / 3.0).sqrt();
        assert_approx(bands.upper[2].unwrap(), 11.0 + 2.0 * sd, DEFAULT_EPSILON);
        assert_approx(bands.lower[2].unwrap(), 11.0 - 2.0 * sd, DEFAULT_EPSILON);
    }

    #[test]
    fn bands_are_symmetric() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + ((i * 7) % 11) as f64).collect();
        let bands = bollinger(&closes, 20, 2.0);
        for i in 19..40 {
            let mid = bands.middle[i].unwrap();
            assert_approx(
                bands.upper[i].unwrap() - mid,
                mid - bands.lower[i].unwrap(),
                1e-9,
            );
        }
    }

    #[test]
    fn flat_prices_collapse_bands() {
        let bands = bollinger(&[100.0; 20], 20, 2.0);
        assert_approx(bands.upper[19].unwrap(), 100.0, DEFAULT_EPSILON);
        assert_approx(bands.lower[19].unwrap(), 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn short_input_is_all_none() {
        let bands = bollinger(&[1.0, 2.0], 20, 2.0);
        assert!(bands.upper.iter().all(Option::is_none));
        assert!(bands.middle.iter().all(Option::is_none));
        assert!(bands.lower.iter().all(Option::is_none));
    }
}
