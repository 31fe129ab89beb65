//! Composite technical outlook for the latest bar.
//!
//! Four components are scored on a 0-100 scale and combined by weight:
//! a 7-bar MACD histogram reversal (30), the graded RSI condition (25), the
//! close's position within the Bollinger bands (20), and the range structure
//! with volume (25). Components whose inputs are missing are left out of the
//! weighted mean. The score maps to a five-step trade signal.

use serde::{Deserialize, Serialize};

use super::pattern::{BandProfile, PatternReport};
use super::summary::MacdTrend;
use crate::domain::AnalyzedRecord;

/// Bars required before an outlook is produced.
pub const MIN_OUTLOOK_BARS: usize = 30;
/// Histogram values inspected for a reversal.
pub const REVERSAL_WINDOW: usize = 7;
/// Reasons kept on a recommendation.
pub const MAX_REASONS: usize = 3;

const MACD_WEIGHT: f64 = 30.0;
const RSI_WEIGHT: f64 = 25.0;
const BAND_WEIGHT: f64 = 20.0;
const PATTERN_WEIGHT: f64 = 25.0;

const NEUTRAL_SCORE: f64 = 50.0;
const REVERSAL_STEP: u8 = 15;
const MAX_REVERSAL_PROBABILITY: u8 = 85;
const BREAKOUT_IMMINENT: u8 = 70;

// ─── MACD reversal ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalDirection {
    Bullish,
    Bearish,
}

/// Sign change of the MACD histogram over the last seven bars.
///
/// A bullish reversal needs the value three bars back below zero, the latest
/// above zero, and the last three values summing above the three before
/// them. A bearish reversal mirrors it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdReversal {
    pub filter_signal: bool,
    pub direction: Option<ReversalDirection>,
    /// Percent, 15 per bar moving in the reversal's direction, capped at 85.
    pub reversal_probability: u8,
    pub increasing_days: usize,
    pub decreasing_days: usize,
    /// `|histogram| * 100` of the latest value.
    pub signal_strength: f64,
}

impl MacdReversal {
    /// Read the reversal from a histogram series, oldest first.
    pub fn from_histogram(histogram: &[f64]) -> Self {
        let signal_strength = histogram.last().map_or(0.0, |h| h.abs() * 100.0);
        if histogram.len() < REVERSAL_WINDOW {
            return Self {
                filter_signal: false,
                direction: None,
                reversal_probability: 0,
                increasing_days: 0,
                decreasing_days: 0,
                signal_strength,
            };
        }

        let r = &histogram[histogram.len() - REVERSAL_WINDOW..];
        let increasing_days = r.windows(2).filter(|w| w[1] > w[0]).count();
        let decreasing_days = REVERSAL_WINDOW - 1 - increasing_days;
        let latest_three: f64 = r[4..].iter().sum();
        let prior_three: f64 = r[1..4].iter().sum();

        let direction = if r[4] < 0.0 && r[6] > 0.0 && latest_three > prior_three {
            Some(ReversalDirection::Bullish)
        } else if r[4] > 0.0 && r[6] < 0.0 && latest_three < prior_three {
            Some(ReversalDirection::Bearish)
        } else {
            None
        };
        let days = match direction {
            Some(ReversalDirection::Bullish) => increasing_days,
            Some(ReversalDirection::Bearish) => decreasing_days,
            None => 0,
        };
        let reversal_probability = (days as u8)
            .saturating_mul(REVERSAL_STEP)
            .min(MAX_REVERSAL_PROBABILITY);

        Self {
            filter_signal: direction.is_some(),
            direction,
            reversal_probability,
            increasing_days,
            decreasing_days,
            signal_strength,
        }
    }
}

// ─── RSI condition ───────────────────────────────────────────────────

/// RSI graded with wider bands than `RsiZone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiCondition {
    ExtremeOverbought,
    Overbought,
    Neutral,
    Oversold,
    ExtremeOversold,
}

impl RsiCondition {
    pub fn classify(rsi: f64) -> Self {
        if rsi >= 75.0 {
            Self::ExtremeOverbought
        } else if rsi >= 65.0 {
            Self::Overbought
        } else if rsi <= 25.0 {
            Self::ExtremeOversold
        } else if rsi <= 35.0 {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }

    pub fn is_oversold(self) -> bool {
        matches!(self, Self::Oversold | Self::ExtremeOversold)
    }

    pub fn is_overbought(self) -> bool {
        matches!(self, Self::Overbought | Self::ExtremeOverbought)
    }

    fn label(self) -> &'static str {
        match self {
            Self::ExtremeOverbought => "extreme overbought",
            Self::Overbought => "overbought",
            Self::Neutral => "neutral",
            Self::Oversold => "oversold",
            Self::ExtremeOversold => "extreme oversold",
        }
    }
}

// ─── Score ───────────────────────────────────────────────────────────

/// Component scores, each 0-100. `None` components carry no weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub macd: Option<f64>,
    pub rsi: Option<f64>,
    pub bollinger: Option<f64>,
    pub pattern: Option<f64>,
}

impl ScoreBreakdown {
    /// Scored only while a reversal is signalled.
    pub fn macd_component(reversal: &MacdReversal) -> Option<f64> {
        reversal
            .filter_signal
            .then(|| reversal.signal_strength.min(100.0))
    }

    pub fn rsi_component(condition: RsiCondition) -> f64 {
        if condition.is_oversold() {
            75.0
        } else if condition.is_overbought() {
            25.0
        } else {
            NEUTRAL_SCORE
        }
    }

    pub fn band_component(bands: &BandProfile) -> f64 {
        if bands.price_position_pct < 20.0 {
            80.0
        } else if bands.price_position_pct > 80.0 {
            20.0
        } else {
            NEUTRAL_SCORE
        }
    }

    /// Needs the market structure; a volume surge adds 15.
    pub fn pattern_component(patterns: &PatternReport) -> Option<f64> {
        let structure = patterns.structure.as_ref()?;
        let surge = patterns.volume.as_ref().is_some_and(|v| v.volume_surge);
        let mut score = NEUTRAL_SCORE;
        if surge {
            score += 15.0;
        }
        score += (f64::from(structure.breakout_probability) - 50.0) * 0.3;
        Some(score.clamp(0.0, 100.0))
    }

    /// Weighted mean of the present components, rounded to two decimals.
    /// 50 when no component is present.
    pub fn total(&self) -> f64 {
        let weighted = [
            (self.macd, MACD_WEIGHT),
            (self.rsi, RSI_WEIGHT),
            (self.bollinger, BAND_WEIGHT),
            (self.pattern, PATTERN_WEIGHT),
        ];
        let (sum, weights) = weighted
            .iter()
            .filter_map(|&(score, weight)| score.map(|s| (s * weight, weight)))
            .fold((0.0, 0.0), |(sum, weights), (s, w)| (sum + s, weights + w));
        if weights == 0.0 {
            return NEUTRAL_SCORE;
        }
        (sum / weights * 100.0).round() / 100.0
    }
}

// ─── Recommendation ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSignal {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl TradeSignal {
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            Self::StrongBuy
        } else if score >= 60.0 {
            Self::Buy
        } else if score <= 25.0 {
            Self::StrongSell
        } else if score <= 40.0 {
            Self::Sell
        } else {
            Self::Hold
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    High,
    Medium,
}

impl RiskLevel {
    /// Scores beyond 80 or below 20 are extreme.
    pub fn from_score(score: f64) -> Self {
        if !(20.0..=80.0).contains(&score) {
            Self::High
        } else {
            Self::Medium
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub signal: TradeSignal,
    pub score: f64,
    pub reasons: Vec<String>,
    pub confidence: f64,
    pub risk_level: RiskLevel,
}

// ─── Outlook ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalOutlook {
    pub macd_phase: Option<MacdTrend>,
    pub macd_reversal: MacdReversal,
    pub rsi_condition: Option<RsiCondition>,
    pub breakdown: ScoreBreakdown,
    pub technical_score: f64,
    pub recommendation: Recommendation,
}

impl TechnicalOutlook {
    /// Assess the last of `records` (date-ordered, one ticker) against its
    /// pattern report. `None` below `MIN_OUTLOOK_BARS` records.
    pub fn assess(records: &[AnalyzedRecord], patterns: &PatternReport) -> Option<Self> {
        if records.len() < MIN_OUTLOOK_BARS {
            return None;
        }
        let latest = records.last()?;
        let ind = &latest.indicators;

        let histogram: Vec<f64> = records
            .iter()
            .filter_map(|r| r.indicators.macd_histogram)
            .collect();
        let macd_reversal = MacdReversal::from_histogram(&histogram);
        let macd_phase = ind.macd.zip(ind.macd_signal).map(|(m, s)| {
            if m > s {
                MacdTrend::Bullish
            } else {
                MacdTrend::Bearish
            }
        });
        let rsi_condition = ind.rsi_14.map(RsiCondition::classify);

        let breakdown = ScoreBreakdown {
            macd: ScoreBreakdown::macd_component(&macd_reversal),
            rsi: rsi_condition.map(ScoreBreakdown::rsi_component),
            bollinger: patterns.bands.as_ref().map(ScoreBreakdown::band_component),
            pattern: ScoreBreakdown::pattern_component(patterns),
        };
        let technical_score = breakdown.total();

        let mut reasons = Vec::new();
        if macd_reversal.filter_signal {
            let phase = match macd_phase {
                Some(MacdTrend::Bullish) => "golden cross",
                Some(MacdTrend::Bearish) => "dead cross",
                None => "no phase",
            };
            reasons.push(format!("MACD reversal ({phase})"));
        }
        if let Some(condition) = rsi_condition.filter(|c| *c != RsiCondition::Neutral) {
            reasons.push(format!("RSI {}", condition.label()));
        }
        if patterns
            .structure
            .as_ref()
            .is_some_and(|s| s.breakout_probability >= BREAKOUT_IMMINENT)
        {
            reasons.push("breakout imminent".to_string());
        }
        if patterns.volume.as_ref().is_some_and(|v| v.volume_surge) {
            reasons.push("volume surge".to_string());
        }
        reasons.truncate(MAX_REASONS);

        Some(Self {
            macd_phase,
            macd_reversal,
            rsi_condition,
            breakdown,
            technical_score,
            recommendation: Recommendation {
                signal: TradeSignal::from_score(technical_score),
                score: technical_score,
                reasons,
                confidence: patterns.confidence,
                risk_level: RiskLevel::from_score(technical_score),
            },
        })
    }

    /// Build the pattern report and assess the latest record against it.
    pub fn from_records(records: &[AnalyzedRecord]) -> Option<Self> {
        let patterns = PatternReport::from_records(records)?;
        Self::assess(records, &patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pattern::{Interest, MarketStructure, MarketType, VolumePattern, VolumeTrend};
    use crate::analysis::{make_bars, Analyzer};
    use crate::indicators::assert_approx;

    fn report() -> PatternReport {
        PatternReport {
            ticker: "TEST".into(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            volume: None,
            trading: None,
            structure: None,
            bands: None,
            levels: None,
            confidence: 50.0,
        }
    }

    fn structure(breakout_probability: u8) -> MarketStructure {
        MarketStructure {
            market_type: MarketType::Sideways,
            price_range_pct: 5.0,
            position_in_range: 50.0,
            box_upper: 105.0,
            box_lower: 100.0,
            breakout_probability,
            squeeze_detected: breakout_probability == 70,
        }
    }

    #[test]
    fn short_histogram_has_no_reversal() {
        let reversal = MacdReversal::from_histogram(&[-3.0, -2.0, -1.0, 1.0, 2.0, 3.0]);
        assert!(!reversal.filter_signal);
        assert_eq!(reversal.reversal_probability, 0);
        assert_approx(reversal.signal_strength, 300.0, 1e-12);
        assert_eq!(MacdReversal::from_histogram(&[]).signal_strength, 0.0);
    }

    #[test]
    fn bullish_reversal_probability_counts_rising_bars() {
        let reversal =
            MacdReversal::from_histogram(&[-5.0, -4.0, -3.0, -2.0, -1.0, 1.0, 2.0]);
        assert_eq!(reversal.direction, Some(ReversalDirection::Bullish));
        assert_eq!(reversal.increasing_days, 6);
        // 6 * 15 = 90, capped
        assert_eq!(reversal.reversal_probability, 85);

        let reversal =
            MacdReversal::from_histogram(&[-1.0, -5.0, -3.0, -4.0, -2.0, 1.0, 0.5]);
        assert_eq!(reversal.direction, Some(ReversalDirection::Bullish));
        assert_eq!(reversal.increasing_days, 3);
        assert_eq!(reversal.decreasing_days, 3);
        assert_eq!(reversal.reversal_probability, 45);
    }

    #[test]
    fn bearish_reversal_and_only_last_seven_count() {
        let mut histogram = vec![-10.0; 20];
        histogram.extend([5.0, 4.0, 3.0, 2.0, 1.0, -1.0, -2.0]);
        let reversal = MacdReversal::from_histogram(&histogram);
        assert_eq!(reversal.direction, Some(ReversalDirection::Bearish));
        assert_eq!(reversal.decreasing_days, 6);
        assert_eq!(reversal.reversal_probability, 85);
    }

    #[test]
    fn no_sign_change_no_reversal() {
        let reversal = MacdReversal::from_histogram(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert!(!reversal.filter_signal);
        assert_eq!(reversal.direction, None);
        assert_eq!(reversal.reversal_probability, 0);

        // Crosses zero but momentum does not confirm.
        let reversal = MacdReversal::from_histogram(&[0.0, 9.0, 9.0, 9.0, -1.0, 0.0, 1.0]);
        assert!(!reversal.filter_signal);
    }

    #[test]
    fn rsi_condition_boundaries() {
        assert_eq!(RsiCondition::classify(75.0), RsiCondition::ExtremeOverbought);
        assert_eq!(RsiCondition::classify(74.9), RsiCondition::Overbought);
        assert_eq!(RsiCondition::classify(65.0), RsiCondition::Overbought);
        assert_eq!(RsiCondition::classify(64.9), RsiCondition::Neutral);
        assert_eq!(RsiCondition::classify(35.1), RsiCondition::Neutral);
        assert_eq!(RsiCondition::classify(35.0), RsiCondition::Oversold);
        assert_eq!(RsiCondition::classify(25.1), RsiCondition::Oversold);
        assert_eq!(RsiCondition::classify(25.0), RsiCondition::ExtremeOversold);
    }

    #[test]
    fn component_scores() {
        assert_eq!(ScoreBreakdown::rsi_component(RsiCondition::ExtremeOversold), 75.0);
        assert_eq!(ScoreBreakdown::rsi_component(RsiCondition::Overbought), 25.0);
        assert_eq!(ScoreBreakdown::rsi_component(RsiCondition::Neutral), 50.0);

        let band = |pos: f64| BandProfile {
            band_width_pct: 6.0,
            price_position_pct: pos,
            volatility: crate::analysis::pattern::Volatility::Normal,
            squeeze: false,
            leaning: crate::analysis::pattern::BreakoutSide::Middle,
        };
        assert_eq!(ScoreBreakdown::band_component(&band(19.9)), 80.0);
        assert_eq!(ScoreBreakdown::band_component(&band(20.0)), 50.0);
        assert_eq!(ScoreBreakdown::band_component(&band(80.0)), 50.0);
        assert_eq!(ScoreBreakdown::band_component(&band(80.1)), 20.0);

        let mut patterns = report();
        assert_eq!(ScoreBreakdown::pattern_component(&patterns), None);
        patterns.structure = Some(structure(30));
        assert_approx(ScoreBreakdown::pattern_component(&patterns).unwrap(), 44.0, 1e-12);
        patterns.structure = Some(structure(70));
        assert_approx(ScoreBreakdown::pattern_component(&patterns).unwrap(), 56.0, 1e-12);
    }

    #[test]
    fn macd_component_needs_reversal_and_caps_at_100() {
        let quiet = MacdReversal::from_histogram(&[0.1; 7]);
        assert_eq!(ScoreBreakdown::macd_component(&quiet), None);
        let small = MacdReversal::from_histogram(&[-0.5, -0.4, -0.3, -0.2, -0.1, 0.1, 0.2]);
        assert_approx(ScoreBreakdown::macd_component(&small).unwrap(), 20.0, 1e-9);
        let large = MacdReversal::from_histogram(&[-5.0, -4.0, -3.0, -2.0, -1.0, 1.0, 2.0]);
        assert_eq!(ScoreBreakdown::macd_component(&large), Some(100.0));
    }

    #[test]
    fn total_is_weighted_and_rounded() {
        assert_eq!(ScoreBreakdown::default().total(), 50.0);
        let all = ScoreBreakdown {
            macd: Some(100.0),
            rsi: Some(75.0),
            bollinger: Some(80.0),
            pattern: Some(50.0),
        };
        // (3000 + 1875 + 1600 + 1250) / 100
        assert_eq!(all.total(), 77.25);
        let partial = ScoreBreakdown {
            rsi: Some(25.0),
            bollinger: Some(80.0),
            ..Default::default()
        };
        // (625 + 1600) / 45 = 49.444...
        assert_eq!(partial.total(), 49.44);
    }

    #[test]
    fn signal_and_risk_thresholds() {
        assert_eq!(TradeSignal::from_score(75.0), TradeSignal::StrongBuy);
        assert_eq!(TradeSignal::from_score(74.99), TradeSignal::Buy);
        assert_eq!(TradeSignal::from_score(60.0), TradeSignal::Buy);
        assert_eq!(TradeSignal::from_score(59.99), TradeSignal::Hold);
        assert_eq!(TradeSignal::from_score(40.01), TradeSignal::Hold);
        assert_eq!(TradeSignal::from_score(40.0), TradeSignal::Sell);
        assert_eq!(TradeSignal::from_score(25.01), TradeSignal::Sell);
        assert_eq!(TradeSignal::from_score(25.0), TradeSignal::StrongSell);

        assert_eq!(RiskLevel::from_score(80.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(80.01), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(20.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(19.99), RiskLevel::High);
    }

    #[test]
    fn short_history_has_no_outlook() {
        let closes: Vec<f64> = (0..29).map(|i| 100.0 + i as f64).collect();
        let records = Analyzer::default().analyze(&make_bars(&closes));
        assert!(TechnicalOutlook::from_records(&records).is_none());
    }

    #[test]
    fn overbought_uptrend_reasons_and_score() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 2.0).collect();
        let records = Analyzer::default().analyze(&make_bars(&closes));
        let outlook = TechnicalOutlook::from_records(&records).unwrap();

        assert_eq!(outlook.rsi_condition, Some(RsiCondition::ExtremeOverbought));
        assert_eq!(outlook.macd_phase, Some(MacdTrend::Bullish));
        assert!(!outlook.macd_reversal.filter_signal);
        assert_eq!(outlook.breakdown.macd, None);
        assert_eq!(outlook.breakdown.rsi, Some(25.0));
        assert_eq!(outlook.recommendation.reasons, ["RSI extreme overbought"]);
        assert_eq!(outlook.recommendation.score, outlook.technical_score);
        assert_eq!(
            outlook.recommendation.signal,
            TradeSignal::from_score(outlook.technical_score)
        );
        assert!((0.0..=100.0).contains(&outlook.technical_score));
    }

    #[test]
    fn reasons_are_capped_at_three() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i % 4) as f64).collect();
        let mut records = Analyzer::default().analyze(&make_bars(&closes));
        let histogram = [-5.0, -4.0, -3.0, -2.0, -1.0, 1.0, 2.0];
        let start = records.len() - histogram.len();
        for (record, h) in records[start..].iter_mut().zip(histogram) {
            record.indicators.macd_histogram = Some(h);
        }
        let last = records.len() - 1;
        records[last].indicators.rsi_14 = Some(20.0);

        let mut patterns = PatternReport::from_records(&records).unwrap();
        patterns.structure = Some(structure(70));
        patterns.volume = Some(VolumePattern {
            current_volume: 5_000,
            average_volume_20: 1_200.0,
            volume_ratio: 5_000.0 / 1_200.0,
            volume_surge: true,
            volume_trend: VolumeTrend::Increasing,
            interest: Interest::Rising,
        });
        let outlook = TechnicalOutlook::assess(&records, &patterns).unwrap();
        let reasons = &outlook.recommendation.reasons;
        assert_eq!(reasons.len(), MAX_REASONS);
        assert!(reasons[0].starts_with("MACD reversal ("), "{reasons:?}");
        assert_eq!(reasons[1], "RSI extreme oversold");
        assert_eq!(reasons[2], "breakout imminent");
        assert!(outlook.macd_reversal.filter_signal);
        assert_eq!(outlook.breakdown.macd, Some(100.0));
    }
}
