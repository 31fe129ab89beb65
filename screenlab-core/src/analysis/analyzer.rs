//! Analysis aggregator: bars in, per-date analyzed records out.

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

use super::config::IndicatorConfig;
use super::summary::{summarize, AnalysisSummary};
use crate::data::group_by_ticker;
use crate::domain::{AnalyzedRecord, Bar, IndicatorSet, Ticker};
use crate::indicators::{bollinger, ema, macd, rsi, sma, stochastic};

/// Computes the indicator suite over one ticker's bars.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: IndicatorConfig,
}

impl Analyzer {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Analyze one ticker's bars.
    ///
    /// Bars are sorted by date (stable, so same-date bars keep input order)
    /// and every indicator is computed once over the whole series. Returns one
    /// record per bar, oldest first.
    pub fn analyze(&self, bars: &[Bar]) -> Vec<AnalyzedRecord> {
        if bars.is_empty() {
            return Vec::new();
        }

        let mut sorted = bars.to_vec();
        sorted.sort_by_key(|bar| bar.date);

        let sets = compute_indicator_sets(&self.config, &sorted);
        let records: Vec<AnalyzedRecord> = sorted
            .into_iter()
            .zip(sets)
            .map(|(bar, indicators)| AnalyzedRecord::new(bar, indicators))
            .collect();

        debug!(
            ticker = %records[0].ticker,
            bars = records.len(),
            complete = records.iter().filter(|r| r.indicators.defined_count() == 14).count(),
            "analyzed bars"
        );
        records
    }

    /// Classify the most recent of `records`.
    pub fn summarize(&self, records: &[AnalyzedRecord]) -> Option<AnalysisSummary> {
        summarize(records)
    }

    /// Analyze a mixed-ticker batch, one series per ticker.
    pub fn analyze_by_ticker(&self, bars: Vec<Bar>) -> BTreeMap<Ticker, Vec<AnalyzedRecord>> {
        group_by_ticker(bars)
            .into_par_iter()
            .map(|(ticker, bars)| (ticker, self.analyze(&bars)))
            .collect()
    }
}

/// Compute one `IndicatorSet` per bar. `bars` must already be date-ordered.
pub fn compute_indicator_sets(config: &IndicatorConfig, bars: &[Bar]) -> Vec<IndicatorSet> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let sma_5 = sma(&closes, config.sma_short);
    let sma_20 = sma(&closes, config.sma_medium);
    let sma_60 = sma(&closes, config.sma_long);
    let ema_12 = ema(&closes, config.ema_fast);
    let ema_26 = ema(&closes, config.ema_slow);
    let macd_series = macd(&closes, config.macd_fast, config.macd_slow, config.macd_signal);
    let rsi_14 = rsi(&closes, config.rsi_period);
    let bands = bollinger(&closes, config.bollinger_period, config.bollinger_std);
    let stoch = stochastic(&highs, &lows, &closes, config.stoch_k, config.stoch_d);

    (0..bars.len())
        .map(|i| IndicatorSet {
            sma_5: sma_5[i],
            sma_20: sma_20[i],
            sma_60: sma_60[i],
            ema_12: ema_12[i],
            ema_26: ema_26[i],
            macd: macd_series.macd[i],
            macd_signal: macd_series.signal[i],
            macd_histogram: macd_series.histogram[i],
            rsi_14: rsi_14[i],
            bollinger_upper: bands.upper[i],
            bollinger_middle: bands.middle[i],
            bollinger_lower: bands.lower[i],
            stoch_k: stoch.k[i],
            stoch_d: stoch.d[i],
        })
        .collect()
}
