//! Screening strategies: parameterized gates plus a 0–1 signal strength.
//!
//! Strategies are stateless. Every evaluation is a pure function of an
//! analyzed record and the parameter map passed in; defaults are owned by
//! the strategy and overrides are merged per call by the caller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::AnalyzedRecord;

pub mod bollinger_squeeze;
pub mod ma_crossover;
pub mod macd_golden_cross;
pub mod market;
pub mod parameters;
pub mod rsi_oversold;
pub mod scoring;

pub use bollinger_squeeze::{BollingerSqueeze, BollingerSqueezeParams};
pub use ma_crossover::{CrossSignal, MaCrossover, MaCrossoverParams};
pub use macd_golden_cross::{MacdGoldenCross, MacdGoldenCrossParams};
pub use market::{MarketContext, PriceRange, VolumeCategory};
pub use parameters::StrategyParameters;
pub use rsi_oversold::{RsiOversold, RsiOversoldParams};

/// Named price levels (targets, stops, breakout lines) attached to a match.
pub type PriceLevels = BTreeMap<String, f64>;

/// Outcome of evaluating one strategy against one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub strategy: String,
    pub ticker: String,
    pub date: NaiveDate,
    pub applies: bool,
    pub signal_strength: f64,
    pub current_price: f64,
    pub volume: u64,
    pub parameters_used: StrategyParameters,
    pub market_context: MarketContext,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub key_levels: PriceLevels,
}

/// A screening strategy.
///
/// `applies` is the hard gate; a record missing any indicator the gate needs
/// does not apply. `signal_strength` is 0 whenever `applies` is false and
/// otherwise lies in [0, 1].
pub trait Strategy: Send + Sync {
    /// Stable lower-case registry id (e.g., "macd_golden_cross").
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn default_parameters(&self) -> StrategyParameters;

    fn applies(&self, record: &AnalyzedRecord, params: &StrategyParameters) -> bool;

    fn signal_strength(&self, record: &AnalyzedRecord, params: &StrategyParameters) -> f64;

    /// Reference price levels for a record that applies. Empty by default.
    fn key_levels(&self, _record: &AnalyzedRecord) -> PriceLevels {
        PriceLevels::new()
    }

    fn evaluate(&self, record: &AnalyzedRecord, params: &StrategyParameters) -> ScreeningResult {
        let applies = self.applies(record, params);
        let (signal_strength, key_levels) = if applies {
            (self.signal_strength(record, params), self.key_levels(record))
        } else {
            (0.0, PriceLevels::new())
        };
        ScreeningResult {
            strategy: self.name().to_string(),
            ticker: record.ticker.clone(),
            date: record.date,
            applies,
            signal_strength,
            current_price: record.close(),
            volume: record.bar.volume,
            parameters_used: params.clone(),
            market_context: MarketContext::from_record(record),
            key_levels,
        }
    }
}

/// The four built-in strategies, in registry order.
pub fn default_strategies() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(MacdGoldenCross),
        Box::new(RsiOversold),
        Box::new(BollingerSqueeze),
        Box::new(MaCrossover),
    ]
}

/// Build a record with the given close, volume and indicators for testing.
#[cfg(test)]
pub fn make_record(
    close: f64,
    volume: u64,
    indicators: crate::domain::IndicatorSet,
) -> AnalyzedRecord {
    use crate::domain::Bar;
    let bar = Bar {
        ticker: "005930".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume,
    };
    AnalyzedRecord::new(bar, indicators)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ids_are_stable_and_lower_case() {
        let names: Vec<String> = default_strategies()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(
            names,
            [
                "macd_golden_cross",
                "rsi_oversold",
                "bollinger_squeeze",
                "moving_average_crossover"
            ]
        );
        for name in &names {
            assert_eq!(name, &name.to_lowercase());
        }
    }

    #[test]
    fn evaluate_zeroes_strength_when_gate_fails() {
        let record = make_record(50_000.0, 1_000_000, Default::default());
        for strategy in default_strategies() {
            let result = strategy.evaluate(&record, &strategy.default_parameters());
            assert!(!result.applies);
            assert_eq!(result.signal_strength, 0.0);
            assert!(result.key_levels.is_empty());
            assert_eq!(result.strategy, strategy.name());
        }
    }
}
