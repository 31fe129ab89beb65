//! Bollinger squeeze: narrow bands with price coiled near the middle line.
//!
//! Parameters (switches are 0/1):
//! `max_band_width_pct`, `ideal_band_width_pct`, `max_distance_from_middle`,
//! `consolidation_required`, `min_volume`, `min_price`, `max_price`,
//! `rsi_neutral_min`, `rsi_neutral_max`, `require_rsi_neutral`,
//! `ma_convergence_threshold`, `require_ma_convergence`, `avoid_penny_stocks`.

use super::market::MarketContext;
use super::parameters::StrategyParameters;
use super::scoring::{unit, weighted, within, ListingGuard};
use super::{PriceLevels, Strategy};
use crate::domain::AnalyzedRecord;

const LISTING_GUARD: ListingGuard = ListingGuard {
    min_price: 5_000.0,
    min_volume: 50_000.0,
    max_price: None,
};

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSqueezeParams {
    pub max_band_width_pct: f64,
    pub ideal_band_width_pct: f64,
    pub max_distance_from_middle: f64,
    pub consolidation_required: bool,
    pub min_volume: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub rsi_neutral_min: f64,
    pub rsi_neutral_max: f64,
    pub require_rsi_neutral: bool,
    pub ma_convergence_threshold: f64,
    pub require_ma_convergence: bool,
    pub avoid_penny_stocks: bool,
}

impl Default for BollingerSqueezeParams {
    fn default() -> Self {
        Self {
            max_band_width_pct: 8.0,
            ideal_band_width_pct: 5.0,
            max_distance_from_middle: 0.02,
            consolidation_required: true,
            min_volume: 100_000.0,
            min_price: 3_000.0,
            max_price: 500_000.0,
            rsi_neutral_min: 40.0,
            rsi_neutral_max: 60.0,
            require_rsi_neutral: true,
            ma_convergence_threshold: 0.03,
            require_ma_convergence: true,
            avoid_penny_stocks: true,
        }
    }
}

impl BollingerSqueezeParams {
    pub fn resolve(params: &StrategyParameters) -> Self {
        let d = Self::default();
        Self {
            max_band_width_pct: params.get_or("max_band_width_pct", d.max_band_width_pct),
            ideal_band_width_pct: params.get_or("ideal_band_width_pct", d.ideal_band_width_pct),
            max_distance_from_middle: params
                .get_or("max_distance_from_middle", d.max_distance_from_middle),
            consolidation_required: params
                .flag("consolidation_required", d.consolidation_required),
            min_volume: params.get_or("min_volume", d.min_volume),
            min_price: params.get_or("min_price", d.min_price),
            max_price: params.get_or("max_price", d.max_price),
            rsi_neutral_min: params.get_or("rsi_neutral_min", d.rsi_neutral_min),
            rsi_neutral_max: params.get_or("rsi_neutral_max", d.rsi_neutral_max),
            require_rsi_neutral: params.flag("require_rsi_neutral", d.require_rsi_neutral),
            ma_convergence_threshold: params
                .get_or("ma_convergence_threshold", d.ma_convergence_threshold),
            require_ma_convergence: params
                .flag("require_ma_convergence", d.require_ma_convergence),
            avoid_penny_stocks: params.flag("avoid_penny_stocks", d.avoid_penny_stocks),
        }
    }

    pub fn to_parameters(&self) -> StrategyParameters {
        StrategyParameters::new()
            .with("max_band_width_pct", self.max_band_width_pct)
            .with("ideal_band_width_pct", self.ideal_band_width_pct)
            .with("max_distance_from_middle", self.max_distance_from_middle)
            .with_flag("consolidation_required", self.consolidation_required)
            .with("min_volume", self.min_volume)
            .with("min_price", self.min_price)
            .with("max_price", self.max_price)
            .with("rsi_neutral_min", self.rsi_neutral_min)
            .with("rsi_neutral_max", self.rsi_neutral_max)
            .with_flag("require_rsi_neutral", self.require_rsi_neutral)
            .with("ma_convergence_threshold", self.ma_convergence_threshold)
            .with_flag("require_ma_convergence", self.require_ma_convergence)
            .with_flag("avoid_penny_stocks", self.avoid_penny_stocks)
    }
}

/// Relative gap between the 20- and 60-bar averages, when both are usable.
fn ma_convergence(record: &AnalyzedRecord) -> Option<f64> {
    let ind = &record.indicators;
    let sma20 = ind.sma_20?;
    let sma60 = ind.sma_60.filter(|&v| v > 0.0)?;
    Some((sma20 - sma60).abs() / sma60)
}

struct Gated {
    band_width_pct: f64,
    distance: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BollingerSqueeze;

impl BollingerSqueeze {
    fn gate(record: &AnalyzedRecord, p: &BollingerSqueezeParams) -> Option<Gated> {
        let ind = &record.indicators;
        let upper = ind.bollinger_upper?;
        let middle = ind.bollinger_middle.filter(|&v| v > 0.0)?;
        let lower = ind.bollinger_lower?;
        let close = record.close();

        let band_width_pct = (upper - lower) / middle * 100.0;
        let distance = (close - middle).abs() / middle;

        let passes = band_width_pct <= p.max_band_width_pct
            && within(close, p.min_price, p.max_price)
            && (!p.consolidation_required || distance <= p.max_distance_from_middle)
            && record.volume() >= p.min_volume
            && (!p.require_rsi_neutral
                || ind
                    .rsi_14
                    .map_or(true, |rsi| within(rsi, p.rsi_neutral_min, p.rsi_neutral_max)))
            && (!p.require_ma_convergence
                || ma_convergence(record).map_or(true, |c| c <= p.ma_convergence_threshold))
            && (!p.avoid_penny_stocks || LISTING_GUARD.passes(record));

        passes.then_some(Gated {
            band_width_pct,
            distance,
        })
    }

    /// Breakout and stop levels around the current bands.
    pub fn breakout_levels(record: &AnalyzedRecord) -> PriceLevels {
        let ind = &record.indicators;
        let mut levels = PriceLevels::new();
        if let Some(upper) = ind.bollinger_upper {
            levels.insert("upper_breakout".into(), upper);
        }
        if let Some(lower) = ind.bollinger_lower {
            levels.insert("lower_breakdown".into(), lower);
        }
        if let Some(middle) = ind.bollinger_middle {
            levels.insert("middle_line".into(), middle);
            levels.insert("stop_loss_upper".into(), middle);
            levels.insert("stop_loss_lower".into(), middle);
        }
        levels
    }
}

fn tightness_score(band_width_pct: f64, p: &BollingerSqueezeParams) -> f64 {
    if band_width_pct <= p.ideal_band_width_pct {
        1.0
    } else {
        f64::max(
            0.0,
            1.0 - (band_width_pct - p.ideal_band_width_pct)
                / (p.max_band_width_pct - p.ideal_band_width_pct),
        )
    }
}

fn neutrality_score(rsi: Option<f64>, p: &BollingerSqueezeParams) -> f64 {
    let Some(rsi) = rsi else {
        return 0.5;
    };
    let center = (p.rsi_neutral_min + p.rsi_neutral_max) / 2.0;
    let half_range = (p.rsi_neutral_max - p.rsi_neutral_min) / 2.0;
    f64::max(0.0, 1.0 - (rsi - center).abs() / half_range)
}

fn convergence_score(record: &AnalyzedRecord, p: &BollingerSqueezeParams) -> f64 {
    match ma_convergence(record) {
        None => 0.5,
        Some(c) if c <= p.ma_convergence_threshold => {
            1.0 - (c / p.ma_convergence_threshold) * 0.5
        }
        Some(_) => 0.2,
    }
}

impl Strategy for BollingerSqueeze {
    fn name(&self) -> &str {
        "bollinger_squeeze"
    }

    fn description(&self) -> &str {
        "Bollinger bands contracted around a consolidating price, ahead of a volatility breakout"
    }

    fn default_parameters(&self) -> StrategyParameters {
        BollingerSqueezeParams::default().to_parameters()
    }

    fn applies(&self, record: &AnalyzedRecord, params: &StrategyParameters) -> bool {
        Self::gate(record, &BollingerSqueezeParams::resolve(params)).is_some()
    }

    fn signal_strength(&self, record: &AnalyzedRecord, params: &StrategyParameters) -> f64 {
        let p = BollingerSqueezeParams::resolve(params);
        let Some(gated) = Self::gate(record, &p) else {
            return 0.0;
        };
        let context = MarketContext::from_record(record);

        let total = weighted(&[
            (0.40, tightness_score(gated.band_width_pct, &p)),
            (
                0.25,
                f64::max(0.0, 1.0 - gated.distance / p.max_distance_from_middle),
            ),
            (0.15, neutrality_score(record.indicators.rsi_14, &p)),
            (0.10, convergence_score(record, &p)),
            (0.10, context.score()),
        ]);

        let multiplier = if context.is_large_cap { 1.05 } else { 1.0 };
        unit(total * multiplier)
    }

    fn key_levels(&self, record: &AnalyzedRecord) -> PriceLevels {
        Self::breakout_levels(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IndicatorSet;
    use crate::indicators::assert_approx;
    use crate::strategies::make_record;

    fn squeeze_indicators() -> IndicatorSet {
        IndicatorSet {
            bollinger_upper: Some(41_000.0),
            bollinger_middle: Some(40_000.0),
            bollinger_lower: Some(39_000.0),
            rsi_14: Some(50.0),
            sma_20: Some(40_000.0),
            sma_60: Some(40_000.0),
            ..Default::default()
        }
    }

    #[test]
    fn perfect_squeeze_scores_high() {
        let record = make_record(40_000.0, 500_000, squeeze_indicators());
        let params = BollingerSqueeze.default_parameters();
        assert!(BollingerSqueeze.applies(&record, &params));
        // width 5% (ideal), on the middle, RSI centered, SMAs equal;
        // market: low volume, low price → 0.5
        let expected = 0.40 + 0.25 + 0.15 + 0.10 + 0.10 * 0.5;
        assert_approx(
            BollingerSqueeze.signal_strength(&record, &params),
            expected,
            1e-12,
        );
    }

    #[test]
    fn wide_bands_do_not_apply() {
        let indicators = IndicatorSet {
            bollinger_upper: Some(42_000.0),
            bollinger_lower: Some(38_000.0),
            ..squeeze_indicators()
        };
        let record = make_record(40_000.0, 500_000, indicators);
        assert!(!BollingerSqueeze.applies(&record, &StrategyParameters::new()));
    }

    #[test]
    fn drifting_from_middle_respects_consolidation_switch() {
        let record = make_record(40_900.0, 500_000, squeeze_indicators());
        assert!(!BollingerSqueeze.applies(&record, &StrategyParameters::new()));
        let params = StrategyParameters::new().with_flag("consolidation_required", false);
        assert!(BollingerSqueeze.applies(&record, &params));
    }

    #[test]
    fn missing_rsi_passes_but_scores_half() {
        let indicators = IndicatorSet {
            rsi_14: None,
            ..squeeze_indicators()
        };
        let record = make_record(40_000.0, 500_000, indicators);
        let params = StrategyParameters::new();
        assert!(BollingerSqueeze.applies(&record, &params));
        let expected = 0.40 + 0.25 + 0.15 * 0.5 + 0.10 + 0.10 * 0.5;
        assert_approx(
            BollingerSqueeze.signal_strength(&record, &params),
            expected,
            1e-12,
        );
    }

    #[test]
    fn diverging_averages_do_not_apply() {
        let indicators = IndicatorSet {
            sma_20: Some(42_000.0),
            ..squeeze_indicators()
        };
        let record = make_record(40_000.0, 500_000, indicators);
        assert!(!BollingerSqueeze.applies(&record, &StrategyParameters::new()));
    }

    #[test]
    fn zero_middle_band_does_not_apply() {
        let indicators = IndicatorSet {
            bollinger_middle: Some(0.0),
            ..squeeze_indicators()
        };
        let record = make_record(40_000.0, 500_000, indicators);
        assert!(!BollingerSqueeze.applies(&record, &StrategyParameters::new()));
        assert_eq!(
            BollingerSqueeze.signal_strength(&record, &StrategyParameters::new()),
            0.0
        );
    }

    #[test]
    fn tightness_falls_off_linearly() {
        let p = BollingerSqueezeParams::default();
        assert_eq!(tightness_score(3.0, &p), 1.0);
        assert_approx(tightness_score(6.5, &p), 0.5, 1e-12);
        assert_eq!(tightness_score(9.0, &p), 0.0);
    }

    #[test]
    fn breakout_levels_follow_bands() {
        let record = make_record(40_000.0, 500_000, squeeze_indicators());
        let result = BollingerSqueeze.evaluate(&record, &StrategyParameters::new());
        assert!(result.applies);
        assert_eq!(result.key_levels["upper_breakout"], 41_000.0);
        assert_eq!(result.key_levels["lower_breakdown"], 39_000.0);
        assert_eq!(result.key_levels["stop_loss_upper"], 40_000.0);
        assert_eq!(result.key_levels["stop_loss_lower"], 40_000.0);
    }
}
