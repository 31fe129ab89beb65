//! RSI oversold: a pullback into oversold territory inside a longer uptrend.
//!
//! Parameters (switches are 0/1):
//! `min_rsi`, `max_rsi`, `optimal_rsi_min`, `optimal_rsi_max`, `min_price`,
//! `max_price`, `min_volume`, `require_uptrend`, `macd_support`,
//! `bollinger_support`, `avoid_penny_stocks`.

use super::market::MarketContext;
use super::parameters::StrategyParameters;
use super::scoring::{unit, weighted, within, ListingGuard};
use super::Strategy;
use crate::domain::AnalyzedRecord;

const LISTING_GUARD: ListingGuard = ListingGuard {
    min_price: 5_000.0,
    min_volume: 30_000.0,
    max_price: None,
};

/// Histogram floor below which MACD momentum is too negative to support a bounce.
const MACD_HISTOGRAM_FLOOR: f64 = -100.0;
/// How far below the lower band the close may sit.
const LOWER_BAND_TOLERANCE: f64 = 0.98;

#[derive(Debug, Clone, PartialEq)]
pub struct RsiOversoldParams {
    pub min_rsi: f64,
    pub max_rsi: f64,
    pub optimal_rsi_min: f64,
    pub optimal_rsi_max: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub min_volume: f64,
    pub require_uptrend: bool,
    pub macd_support: bool,
    pub bollinger_support: bool,
    pub avoid_penny_stocks: bool,
}

impl Default for RsiOversoldParams {
    fn default() -> Self {
        Self {
            min_rsi: 20.0,
            max_rsi: 35.0,
            optimal_rsi_min: 25.0,
            optimal_rsi_max: 35.0,
            min_price: 2_000.0,
            max_price: 800_000.0,
            min_volume: 50_000.0,
            require_uptrend: true,
            macd_support: true,
            bollinger_support: true,
            avoid_penny_stocks: true,
        }
    }
}

impl RsiOversoldParams {
    pub fn resolve(params: &StrategyParameters) -> Self {
        let d = Self::default();
        Self {
            min_rsi: params.get_or("min_rsi", d.min_rsi),
            max_rsi: params.get_or("max_rsi", d.max_rsi),
            optimal_rsi_min: params.get_or("optimal_rsi_min", d.optimal_rsi_min),
            optimal_rsi_max: params.get_or("optimal_rsi_max", d.optimal_rsi_max),
            min_price: params.get_or("min_price", d.min_price),
            max_price: params.get_or("max_price", d.max_price),
            min_volume: params.get_or("min_volume", d.min_volume),
            require_uptrend: params.flag("require_uptrend", d.require_uptrend),
            macd_support: params.flag("macd_support", d.macd_support),
            bollinger_support: params.flag("bollinger_support", d.bollinger_support),
            avoid_penny_stocks: params.flag("avoid_penny_stocks", d.avoid_penny_stocks),
        }
    }

    pub fn to_parameters(&self) -> StrategyParameters {
        StrategyParameters::new()
            .with("min_rsi", self.min_rsi)
            .with("max_rsi", self.max_rsi)
            .with("optimal_rsi_min", self.optimal_rsi_min)
            .with("optimal_rsi_max", self.optimal_rsi_max)
            .with("min_price", self.min_price)
            .with("max_price", self.max_price)
            .with("min_volume", self.min_volume)
            .with_flag("require_uptrend", self.require_uptrend)
            .with_flag("macd_support", self.macd_support)
            .with_flag("bollinger_support", self.bollinger_support)
            .with_flag("avoid_penny_stocks", self.avoid_penny_stocks)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RsiOversold;

impl RsiOversold {
    fn gate(record: &AnalyzedRecord, p: &RsiOversoldParams) -> Option<f64> {
        let ind = &record.indicators;
        let rsi = ind.rsi_14?;
        let close = record.close();

        let passes = within(rsi, p.min_rsi, p.max_rsi)
            && within(close, p.min_price, p.max_price)
            && record.volume() >= p.min_volume
            && (!p.require_uptrend || ind.sma_60.is_some_and(|sma| close >= sma))
            && (!p.macd_support
                || ind
                    .macd_histogram
                    .map_or(true, |hist| hist > MACD_HISTOGRAM_FLOOR))
            && (!p.bollinger_support
                || ind
                    .bollinger_lower
                    .map_or(true, |lower| close >= lower * LOWER_BAND_TOLERANCE))
            && (!p.avoid_penny_stocks || LISTING_GUARD.passes(record));

        passes.then_some(rsi)
    }
}

fn depth_score(rsi: f64, p: &RsiOversoldParams) -> f64 {
    if within(rsi, p.optimal_rsi_min, p.optimal_rsi_max) {
        1.0
    } else if rsi >= p.min_rsi && rsi < p.optimal_rsi_min {
        0.7 + (rsi - p.min_rsi) / (p.optimal_rsi_min - p.min_rsi) * 0.3
    } else if rsi > p.optimal_rsi_max && rsi <= p.max_rsi {
        1.0 - (rsi - p.optimal_rsi_max) / (p.max_rsi - p.optimal_rsi_max) * 0.4
    } else {
        0.3
    }
}

fn moving_average_support(record: &AnalyzedRecord) -> f64 {
    let ind = &record.indicators;
    let close = record.close();
    let mut score = 0.0;
    if let Some(sma20) = ind.sma_20.filter(|&v| v > 0.0) {
        let distance = (close - sma20).abs() / sma20;
        if distance <= 0.03 {
            score += 0.4;
        } else if distance <= 0.05 {
            score += 0.2;
        }
    }
    if ind.sma_60.is_some_and(|sma60| close > sma60) {
        score += 0.6;
    }
    f64::min(score, 1.0)
}

fn macd_support(record: &AnalyzedRecord) -> f64 {
    let ind = &record.indicators;
    let (Some(macd), Some(signal), Some(hist)) = (ind.macd, ind.macd_signal, ind.macd_histogram)
    else {
        return 0.5;
    };
    let mut score = 0.0;
    if hist > 0.0 {
        score += 0.4;
    }
    if macd > signal {
        score += 0.6;
    }
    f64::min(score, 1.0)
}

fn band_proximity(record: &AnalyzedRecord) -> f64 {
    let ind = &record.indicators;
    let (Some(lower), Some(middle)) = (ind.bollinger_lower, ind.bollinger_middle) else {
        return 0.5;
    };
    let close = record.close();
    if close <= lower * 1.02 {
        1.0
    } else if close <= lower * 1.05 {
        0.7
    } else if close <= middle {
        0.4
    } else {
        0.2
    }
}

impl Strategy for RsiOversold {
    fn name(&self) -> &str {
        "rsi_oversold"
    }

    fn description(&self) -> &str {
        "RSI pulled back into the oversold zone while price holds above its long-term average"
    }

    fn default_parameters(&self) -> StrategyParameters {
        RsiOversoldParams::default().to_parameters()
    }

    fn applies(&self, record: &AnalyzedRecord, params: &StrategyParameters) -> bool {
        Self::gate(record, &RsiOversoldParams::resolve(params)).is_some()
    }

    fn signal_strength(&self, record: &AnalyzedRecord, params: &StrategyParameters) -> f64 {
        let p = RsiOversoldParams::resolve(params);
        let Some(rsi) = Self::gate(record, &p) else {
            return 0.0;
        };
        let context = MarketContext::from_record(record);

        let total = weighted(&[
            (0.30, depth_score(rsi, &p)),
            (0.25, moving_average_support(record)),
            (0.20, macd_support(record)),
            (0.15, band_proximity(record)),
            (0.10, context.score()),
        ]);

        let multiplier = if context.is_large_cap { 1.1 } else { 1.0 };
        unit(total * multiplier)
    }
}
