//! Analysis aggregator: indicator suite per bar, latest-bar summary,
//! price/volume pattern report, and the composite technical outlook.

pub mod analyzer;
pub mod config;
pub mod outlook;
pub mod pattern;
pub mod summary;

pub use analyzer::{compute_indicator_sets, Analyzer};
pub use config::IndicatorConfig;
pub use outlook::{
    MacdReversal, Recommendation, ReversalDirection, RiskLevel, RsiCondition, ScoreBreakdown,
    TechnicalOutlook, TradeSignal,
};
pub use pattern::{
    pattern_confidence, BandProfile, FlowSignal, MarketStructure, MarketType, PatternReport,
    SizeTier, SupportResistance, TradingProfile, VolumePattern, VolumeTrend,
};
pub use summary::{
    summarize, AnalysisSummary, BandPosition, IndicatorSnapshot, MacdTrend, RsiZone, SignalLabels,
    SmaPosition,
};

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                ticker: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}
