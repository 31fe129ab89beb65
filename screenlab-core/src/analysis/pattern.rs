//! Price and volume pattern report for the latest bar.
//!
//! Independent views over a ticker's recent history: volume activity, trading
//! size and price/volume flow, range structure, Bollinger band profile, and
//! pivot-based support and resistance. A view whose history is too short is
//! left out. The report also carries a 0-100 confidence built from the
//! volume and flow views.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::AnalyzedRecord;

const VOLUME_AVERAGE_WINDOW: usize = 20;
const VOLUME_TREND_WINDOW: usize = 5;
const VOLUME_SURGE_RATIO: f64 = 2.0;
const VOLUME_FADING_RATIO: f64 = 0.7;

const LARGE_TRADING_VALUE: f64 = 50_000_000_000.0;
const MID_TRADING_VALUE: f64 = 10_000_000_000.0;
const FLOW_WINDOW: usize = 10;
const FLOW_CORRELATION: f64 = 0.5;

const NEUTRAL_CONFIDENCE: f64 = 50.0;

const STRUCTURE_WINDOW: usize = 30;
const SIDEWAYS_RANGE_PCT: f64 = 10.0;

const BAND_SQUEEZE_PCT: f64 = 5.0;
const BAND_HIGH_VOLATILITY_PCT: f64 = 10.0;

const LEVELS_WINDOW: usize = 90;
const PIVOT_SPAN: usize = 2;
const LEVEL_PROXIMITY: f64 = 0.15;
const FALLBACK_SUPPORT: f64 = 0.95;
const FALLBACK_RESISTANCE: f64 = 1.05;

// ─── Volume ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interest {
    Rising,
    Normal,
    Fading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePattern {
    pub current_volume: u64,
    pub average_volume_20: f64,
    pub volume_ratio: f64,
    pub volume_surge: bool,
    pub volume_trend: VolumeTrend,
    pub interest: Interest,
}

impl VolumePattern {
    fn from_volumes(volumes: &[u64]) -> Option<Self> {
        if volumes.len() < VOLUME_AVERAGE_WINDOW {
            return None;
        }
        let current = *volumes.last()?;
        let window = &volumes[volumes.len() - VOLUME_AVERAGE_WINDOW..];
        let average = window.iter().map(|&v| v as f64).sum::<f64>() / VOLUME_AVERAGE_WINDOW as f64;
        let ratio = if average > 0.0 {
            current as f64 / average
        } else {
            1.0
        };

        let recent = &volumes[volumes.len() - VOLUME_TREND_WINDOW..];
        let volume_trend = if recent.windows(2).all(|w| w[0] <= w[1]) {
            VolumeTrend::Increasing
        } else if recent.windows(2).all(|w| w[0] >= w[1]) {
            VolumeTrend::Decreasing
        } else {
            VolumeTrend::Mixed
        };

        let volume_surge = ratio > VOLUME_SURGE_RATIO;
        let interest = if volume_surge {
            Interest::Rising
        } else if ratio < VOLUME_FADING_RATIO {
            Interest::Fading
        } else {
            Interest::Normal
        };

        Some(Self {
            current_volume: current,
            average_volume_20: average,
            volume_ratio: ratio,
            volume_surge,
            volume_trend,
            interest,
        })
    }
}

// ─── Trading profile ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeTier {
    Large,
    Mid,
    Small,
}

impl SizeTier {
    fn from_trading_value(value: f64) -> Self {
        if value > LARGE_TRADING_VALUE {
            Self::Large
        } else if value > MID_TRADING_VALUE {
            Self::Mid
        } else {
            Self::Small
        }
    }

    /// Estimated weight of large holders in the order flow.
    pub fn institutional_weight(self) -> f64 {
        match self {
            Self::Large => 0.7,
            Self::Mid => 0.5,
            Self::Small => 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowSignal {
    Buying,
    Neutral,
    Selling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingProfile {
    /// Close times the 20-bar average volume.
    pub trading_value: f64,
    pub size_tier: SizeTier,
    pub institutional_weight: f64,
    /// Pearson correlation of the last 10 closes and volumes. Absent when
    /// either series is flat.
    pub price_volume_correlation: Option<f64>,
    pub flow: FlowSignal,
}

fn correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    if xs.iter().all(|&x| x == xs[0]) || ys.iter().all(|&y| y == ys[0]) {
        return None;
    }
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (&x, &y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    Some(cov / (var_x * var_y).sqrt())
}

impl TradingProfile {
    fn from_series(closes: &[f64], volumes: &[u64]) -> Option<Self> {
        if closes.len() != volumes.len() || volumes.len() < VOLUME_AVERAGE_WINDOW {
            return None;
        }
        let current = *closes.last()?;
        let average_volume = volumes[volumes.len() - VOLUME_AVERAGE_WINDOW..]
            .iter()
            .map(|&v| v as f64)
            .sum::<f64>()
            / VOLUME_AVERAGE_WINDOW as f64;
        let trading_value = current * average_volume;
        let size_tier = SizeTier::from_trading_value(trading_value);

        let start = closes.len() - FLOW_WINDOW.min(closes.len());
        let recent_volumes: Vec<f64> = volumes[start..].iter().map(|&v| v as f64).collect();
        let price_volume_correlation = correlation(&closes[start..], &recent_volumes);
        let flow = match price_volume_correlation {
            Some(c) if c > FLOW_CORRELATION => FlowSignal::Buying,
            Some(c) if c < -FLOW_CORRELATION => FlowSignal::Selling,
            _ => FlowSignal::Neutral,
        };

        Some(Self {
            trading_value,
            size_tier,
            institutional_weight: size_tier.institutional_weight(),
            price_volume_correlation,
            flow,
        })
    }
}

/// Mean of the volume and flow confidence factors, 50 when neither view is
/// available.
///
/// A volume ratio above 0.5 contributes `min(ratio * 20, 80)`, a lower ratio
/// 40. A price/volume correlation contributes `min(|corr| * 100, 90)`.
pub fn pattern_confidence(
    volume: Option<&VolumePattern>,
    trading: Option<&TradingProfile>,
) -> f64 {
    let volume_factor = volume.map(|v| {
        if v.volume_ratio > 0.5 {
            (v.volume_ratio * 20.0).min(80.0)
        } else {
            40.0
        }
    });
    let flow_factor = trading
        .and_then(|t| t.price_volume_correlation)
        .map(|c| (c.abs() * 100.0).min(90.0));
    let factors: Vec<f64> = volume_factor.into_iter().chain(flow_factor).collect();
    if factors.is_empty() {
        NEUTRAL_CONFIDENCE
    } else {
        factors.iter().sum::<f64>() / factors.len() as f64
    }
}

// ─── Bands ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Volatility {
    High,
    Normal,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakoutSide {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandProfile {
    pub band_width_pct: f64,
    /// Position of the close between the bands, 0 at lower and 100 at upper.
    pub price_position_pct: f64,
    pub volatility: Volatility,
    pub squeeze: bool,
    pub leaning: BreakoutSide,
}

impl BandProfile {
    fn from_record(record: &AnalyzedRecord) -> Option<Self> {
        let ind = &record.indicators;
        let (upper, middle, lower) = (
            ind.bollinger_upper?,
            ind.bollinger_middle?,
            ind.bollinger_lower?,
        );
        if middle <= 0.0 {
            return None;
        }
        let band_width_pct = (upper - lower) / middle * 100.0;
        let price_position_pct = if upper != lower {
            (record.close() - lower) / (upper - lower) * 100.0
        } else {
            50.0
        };
        let volatility = if band_width_pct > BAND_HIGH_VOLATILITY_PCT {
            Volatility::High
        } else if band_width_pct < BAND_SQUEEZE_PCT {
            Volatility::Low
        } else {
            Volatility::Normal
        };
        let leaning = if price_position_pct > 80.0 {
            BreakoutSide::Upper
        } else if price_position_pct < 20.0 {
            BreakoutSide::Lower
        } else {
            BreakoutSide::Middle
        };
        Some(Self {
            band_width_pct,
            price_position_pct,
            volatility,
            squeeze: band_width_pct < BAND_SQUEEZE_PCT,
            leaning,
        })
    }
}

// ─── Market structure ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    Sideways,
    Trending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStructure {
    pub market_type: MarketType,
    pub price_range_pct: f64,
    pub position_in_range: f64,
    pub box_upper: f64,
    pub box_lower: f64,
    /// Rough odds (percent) of leaving the box: 70 in a squeezed sideways
    /// market, 30 sideways without a squeeze, 50 otherwise.
    pub breakout_probability: u8,
    pub squeeze_detected: bool,
}

impl MarketStructure {
    fn from_closes(closes: &[f64], squeeze: bool) -> Option<Self> {
        let window = &closes[closes.len().saturating_sub(STRUCTURE_WINDOW)..];
        let current = *window.last()?;
        let high = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let low = window.iter().copied().fold(f64::INFINITY, f64::min);
        let center = (high + low) / 2.0;
        if center <= 0.0 {
            return None;
        }
        let range = high - low;
        let price_range_pct = range / center * 100.0;
        let sideways = price_range_pct < SIDEWAYS_RANGE_PCT;
        let position_in_range = if range > 0.0 {
            (current - low) / range * 100.0
        } else {
            50.0
        };
        let breakout_probability = match (sideways, squeeze) {
            (true, true) => 70,
            (true, false) => 30,
            (false, _) => 50,
        };
        Some(Self {
            market_type: if sideways {
                MarketType::Sideways
            } else {
                MarketType::Trending
            },
            price_range_pct,
            position_in_range,
            box_upper: high,
            box_lower: low,
            breakout_probability,
            squeeze_detected: squeeze,
        })
    }
}

// ─── Support / resistance ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub key_support: f64,
    pub key_resistance: f64,
    /// Pivot lows within reach below the close.
    pub support_strength: usize,
    /// Pivot highs within reach above the close.
    pub resistance_strength: usize,
    pub distance_to_support_pct: f64,
    pub distance_to_resistance_pct: f64,
}

/// Indices whose value is at least as extreme as the `PIVOT_SPAN` neighbours
/// on each side, under `is_extreme(candidate, neighbour)`.
fn pivots(values: &[f64], is_extreme: impl Fn(f64, f64) -> bool) -> Vec<f64> {
    if values.len() < 2 * PIVOT_SPAN + 1 {
        return Vec::new();
    }
    (PIVOT_SPAN..values.len() - PIVOT_SPAN)
        .filter(|&i| {
            (i - PIVOT_SPAN..=i + PIVOT_SPAN)
                .filter(|&j| j != i)
                .all(|j| is_extreme(values[i], values[j]))
        })
        .map(|i| values[i])
        .collect()
}

impl SupportResistance {
    fn from_records(records: &[AnalyzedRecord]) -> Option<Self> {
        let window = &records[records.len().saturating_sub(LEVELS_WINDOW)..];
        let current = window.last()?.close();
        if current <= 0.0 {
            return None;
        }
        let lows: Vec<f64> = window.iter().map(|r| r.bar.low).collect();
        let highs: Vec<f64> = window.iter().map(|r| r.bar.high).collect();
        let reach = current * LEVEL_PROXIMITY;

        let supports: Vec<f64> = pivots(&lows, |v, n| v <= n)
            .into_iter()
            .filter(|&s| s < current && current - s < reach)
            .collect();
        let resistances: Vec<f64> = pivots(&highs, |v, n| v >= n)
            .into_iter()
            .filter(|&r| r > current && r - current < reach)
            .collect();

        let key_support = supports
            .iter()
            .copied()
            .reduce(f64::max)
            .unwrap_or(current * FALLBACK_SUPPORT);
        let key_resistance = resistances
            .iter()
            .copied()
            .reduce(f64::min)
            .unwrap_or(current * FALLBACK_RESISTANCE);

        Some(Self {
            key_support,
            key_resistance,
            support_strength: supports.len(),
            resistance_strength: resistances.len(),
            distance_to_support_pct: (current - key_support) / current * 100.0,
            distance_to_resistance_pct: (key_resistance - current) / current * 100.0,
        })
    }
}

// ─── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub ticker: String,
    pub date: NaiveDate,
    pub volume: Option<VolumePattern>,
    pub trading: Option<TradingProfile>,
    pub structure: Option<MarketStructure>,
    pub bands: Option<BandProfile>,
    pub levels: Option<SupportResistance>,
    pub confidence: f64,
}

impl PatternReport {
    /// Build the report for the last of `records` (date-ordered, one ticker).
    pub fn from_records(records: &[AnalyzedRecord]) -> Option<Self> {
        let latest = records.last()?;
        let volumes: Vec<u64> = records.iter().map(|r| r.bar.volume).collect();
        let closes: Vec<f64> = records.iter().map(|r| r.close()).collect();
        let bands = BandProfile::from_record(latest);
        let squeeze = bands.as_ref().is_some_and(|b| b.squeeze);
        let volume = VolumePattern::from_volumes(&volumes);
        let trading = TradingProfile::from_series(&closes, &volumes);
        let confidence = pattern_confidence(volume.as_ref(), trading.as_ref());

        Some(Self {
            ticker: latest.ticker.clone(),
            date: latest.date,
            volume,
            trading,
            structure: MarketStructure::from_closes(&closes, squeeze),
            bands,
            levels: SupportResistance::from_records(records),
            confidence,
        })
    }
}
