//! Per-date indicator snapshot.

use serde::{Deserialize, Serialize};

/// Indicator values for one bar.
///
/// A field is `None` until its warm-up window is satisfied. Field names stay
/// fixed regardless of the periods the analyzer was configured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub sma_5: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_60: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub rsi_14: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
}

impl IndicatorSet {
    fn fields(&self) -> [Option<f64>; 14] {
        [
            self.sma_5,
            self.sma_20,
            self.sma_60,
            self.ema_12,
            self.ema_26,
            self.macd,
            self.macd_signal,
            self.macd_histogram,
            self.rsi_14,
            self.bollinger_upper,
            self.bollinger_middle,
            self.bollinger_lower,
            self.stoch_k,
            self.stoch_d,
        ]
    }

    /// True when no indicator has a value yet.
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(Option::is_none)
    }

    /// Number of indicators with a value.
    pub fn defined_count(&self) -> usize {
        self.fields().iter().filter(|v| v.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        let set = IndicatorSet::default();
        assert!(set.is_empty());
        assert_eq!(set.defined_count(), 0);
    }

    #[test]
    fn one_value_makes_it_non_empty() {
        let set = IndicatorSet {
            stoch_d: Some(42.0),
            ..Default::default()
        };
        assert!(!set.is_empty());
        assert_eq!(set.defined_count(), 1);
    }

    #[test]
    fn missing_values_serialize_as_null() {
        let set = IndicatorSet {
            rsi_14: Some(55.5),
            ..Default::default()
        };
        let json = serde_json::to_value(set).unwrap();
        assert_eq!(json["rsi_14"], serde_json::json!(55.5));
        assert!(json["macd"].is_null());
    }
}
