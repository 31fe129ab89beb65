//! Scoring helpers shared by the strategies.

use crate::domain::AnalyzedRecord;

/// Clamp to [0, 1]; NaN scores as 0.
pub fn unit(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Weighted sum of `(weight, sub_score)` pairs, each sub-score clamped first.
pub fn weighted(parts: &[(f64, f64)]) -> f64 {
    parts.iter().map(|&(weight, score)| weight * unit(score)).sum()
}

/// Inclusive range check that rejects NaN.
pub fn within(value: f64, min: f64, max: f64) -> bool {
    value >= min && value <= max
}

/// Minimum listing quality applied when `avoid_penny_stocks` is on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListingGuard {
    pub min_price: f64,
    pub min_volume: f64,
    pub max_price: Option<f64>,
}

impl ListingGuard {
    pub fn passes(&self, record: &AnalyzedRecord) -> bool {
        let close = record.close();
        close >= self.min_price
            && record.volume() >= self.min_volume
            && self.max_price.map_or(true, |max| close <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_clamps_and_zeroes_nan() {
        assert_eq!(unit(f64::NAN), 0.0);
        assert_eq!(unit(-0.5), 0.0);
        assert_eq!(unit(1.7), 1.0);
        assert_eq!(unit(f64::INFINITY), 1.0);
        assert_eq!(unit(0.25), 0.25);
    }

    #[test]
    fn weighted_clamps_parts() {
        let total = weighted(&[(0.5, 2.0), (0.5, f64::NAN)]);
        assert_eq!(total, 0.5);
    }

    #[test]
    fn within_is_inclusive() {
        assert!(within(30.0, 30.0, 75.0));
        assert!(within(75.0, 30.0, 75.0));
        assert!(!within(f64::NAN, 30.0, 75.0));
    }
}
