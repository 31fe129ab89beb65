//! Bar: the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for a single ticker.
///
/// Prices are quoted in the listing currency with no adjustment applied.
/// Bars are immutable once collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// A violated bar invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BarError {
    #[error("missing ticker")]
    MissingTicker,
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("high {high} is below low {low}")]
    HighBelowLow { high: f64, low: f64 },
    #[error("{field} {value} lies outside [{low}, {high}]")]
    OutsideRange {
        field: &'static str,
        value: f64,
        low: f64,
        high: f64,
    },
}

impl Bar {
    fn prices(&self) -> [(&'static str, f64); 4] {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ]
    }

    /// Check the OHLC invariants, reporting the first one violated.
    pub fn validate(&self) -> Result<(), BarError> {
        if self.ticker.trim().is_empty() {
            return Err(BarError::MissingTicker);
        }
        for (field, value) in self.prices() {
            if !value.is_finite() {
                return Err(BarError::NonFinite { field });
            }
            if value <= 0.0 {
                return Err(BarError::NonPositive { field, value });
            }
        }
        if self.high < self.low {
            return Err(BarError::HighBelowLow {
                high: self.high,
                low: self.low,
            });
        }
        for (field, value) in [("open", self.open), ("close", self.close)] {
            if value < self.low || value > self.high {
                return Err(BarError::OutsideRange {
                    field,
                    value,
                    low: self.low,
                    high: self.high,
                });
            }
        }
        Ok(())
    }

    pub fn is_sane(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            ticker: "005930".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 52_000.0,
            high: 53_500.0,
            low: 51_800.0,
            close: 53_000.0,
            volume: 24_674_774,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_nan_price() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert_eq!(bar.validate(), Err(BarError::NonFinite { field: "open" }));
    }

    #[test]
    fn bar_detects_high_below_low() {
        let mut bar = sample_bar();
        bar.high = 51_000.0;
        assert!(matches!(
            bar.validate(),
            Err(BarError::HighBelowLow { .. })
        ));
    }

    #[test]
    fn bar_detects_close_outside_range() {
        let mut bar = sample_bar();
        bar.close = 54_000.0;
        assert!(matches!(
            bar.validate(),
            Err(BarError::OutsideRange { field: "close", .. })
        ));
    }

    #[test]
    fn bar_detects_zero_price_and_blank_ticker() {
        let mut bar = sample_bar();
        bar.low = 0.0;
        assert!(matches!(
            bar.validate(),
            Err(BarError::NonPositive { field: "low", .. })
        ));

        let mut bar = sample_bar();
        bar.ticker = "  ".into();
        assert_eq!(bar.validate(), Err(BarError::MissingTicker));
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
