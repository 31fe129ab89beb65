//! MACD golden cross: MACD above its signal line with a widening histogram.
//!
//! Parameters (switches are 0/1):
//! `min_histogram`, `macd_momentum_threshold`, `min_volume`, `min_rsi`,
//! `max_rsi`, `min_price`, `max_price`, `price_above_sma20`,
//! `avoid_penny_stocks`.

use super::market::MarketContext;
use super::parameters::StrategyParameters;
use super::scoring::{unit, weighted, within, ListingGuard};
use super::Strategy;
use crate::domain::AnalyzedRecord;

const LISTING_GUARD: ListingGuard = ListingGuard {
    min_price: 5_000.0,
    min_volume: 50_000.0,
    max_price: Some(1_000_000.0),
};

#[derive(Debug, Clone, PartialEq)]
pub struct MacdGoldenCrossParams {
    pub min_histogram: f64,
    pub macd_momentum_threshold: f64,
    pub min_volume: f64,
    pub min_rsi: f64,
    pub max_rsi: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub price_above_sma20: bool,
    pub avoid_penny_stocks: bool,
}

impl Default for MacdGoldenCrossParams {
    fn default() -> Self {
        Self {
            min_histogram: 50.0,
            macd_momentum_threshold: 100.0,
            min_volume: 100_000.0,
            min_rsi: 30.0,
            max_rsi: 75.0,
            min_price: 1_000.0,
            max_price: 1_000_000.0,
            price_above_sma20: true,
            avoid_penny_stocks: true,
        }
    }
}

impl MacdGoldenCrossParams {
    /// Resolve typed parameters, taking defaults for absent keys.
    pub fn resolve(params: &StrategyParameters) -> Self {
        let d = Self::default();
        Self {
            min_histogram: params.get_or("min_histogram", d.min_histogram),
            macd_momentum_threshold: params
                .get_or("macd_momentum_threshold", d.macd_momentum_threshold),
            min_volume: params.get_or("min_volume", d.min_volume),
            min_rsi: params.get_or("min_rsi", d.min_rsi),
            max_rsi: params.get_or("max_rsi", d.max_rsi),
            min_price: params.get_or("min_price", d.min_price),
            max_price: params.get_or("max_price", d.max_price),
            price_above_sma20: params.flag("price_above_sma20", d.price_above_sma20),
            avoid_penny_stocks: params.flag("avoid_penny_stocks", d.avoid_penny_stocks),
        }
    }

    pub fn to_parameters(&self) -> StrategyParameters {
        StrategyParameters::new()
            .with("min_histogram", self.min_histogram)
            .with("macd_momentum_threshold", self.macd_momentum_threshold)
            .with("min_volume", self.min_volume)
            .with("min_rsi", self.min_rsi)
            .with("max_rsi", self.max_rsi)
            .with("min_price", self.min_price)
            .with("max_price", self.max_price)
            .with_flag("price_above_sma20", self.price_above_sma20)
            .with_flag("avoid_penny_stocks", self.avoid_penny_stocks)
    }
}

/// Values the gate extracted from a record that passed it.
struct Gated {
    histogram: f64,
    rsi: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MacdGoldenCross;

impl MacdGoldenCross {
    fn gate(record: &AnalyzedRecord, p: &MacdGoldenCrossParams) -> Option<Gated> {
        let ind = &record.indicators;
        let (macd, signal, histogram, rsi) =
            (ind.macd?, ind.macd_signal?, ind.macd_histogram?, ind.rsi_14?);
        let close = record.close();

        let passes = macd > signal
            && histogram > p.min_histogram
            && within(close, p.min_price, p.max_price)
            && record.volume() >= p.min_volume
            && within(rsi, p.min_rsi, p.max_rsi)
            && (!p.price_above_sma20 || ind.sma_20.is_some_and(|sma| close >= sma))
            && (!p.avoid_penny_stocks || LISTING_GUARD.passes(record));

        passes.then_some(Gated { histogram, rsi })
    }
}

/// RSI preference curve: peaks at 57.5, tolerates 40–75.
fn rsi_score(rsi: f64) -> f64 {
    if (50.0..=65.0).contains(&rsi) {
        1.0 - (rsi - 57.5).abs() / 7.5
    } else if (40.0..50.0).contains(&rsi) {
        0.6 + (rsi - 40.0) / 10.0 * 0.4
    } else if rsi > 65.0 && rsi <= 75.0 {
        0.8 - (rsi - 65.0) / 10.0 * 0.6
    } else {
        0.2
    }
}

fn alignment_score(record: &AnalyzedRecord) -> f64 {
    let ind = &record.indicators;
    let (Some(sma5), Some(sma20), Some(sma60)) = (ind.sma_5, ind.sma_20, ind.sma_60) else {
        return 0.0;
    };
    let close = record.close();
    if close > sma5 && sma5 > sma20 && sma20 > sma60 {
        1.0
    } else if close > sma5 && sma5 > sma20 {
        0.8
    } else if close > sma20 {
        0.6
    } else {
        0.3
    }
}

impl Strategy for MacdGoldenCross {
    fn name(&self) -> &str {
        "macd_golden_cross"
    }

    fn description(&self) -> &str {
        "MACD above its signal line with positive histogram momentum, confirmed by RSI, volume and trend"
    }

    fn default_parameters(&self) -> StrategyParameters {
        MacdGoldenCrossParams::default().to_parameters()
    }

    fn applies(&self, record: &AnalyzedRecord, params: &StrategyParameters) -> bool {
        Self::gate(record, &MacdGoldenCrossParams::resolve(params)).is_some()
    }

    fn signal_strength(&self, record: &AnalyzedRecord, params: &StrategyParameters) -> f64 {
        let p = MacdGoldenCrossParams::resolve(params);
        let Some(gated) = Self::gate(record, &p) else {
            return 0.0;
        };
        let context = MarketContext::from_record(record);

        let total = weighted(&[
            (0.30, gated.histogram / p.macd_momentum_threshold),
            (0.20, record.volume() / (p.min_volume * 3.0)),
            (0.20, rsi_score(gated.rsi)),
            (0.15, alignment_score(record)),
            (0.15, context.score()),
        ]);

        let mut multiplier = 1.0;
        if context.is_large_cap {
            multiplier *= 1.1;
        }
        if context.heavy_volume() {
            multiplier *= 1.05;
        }
        unit(total * multiplier)
    }
}
