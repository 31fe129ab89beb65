//! Moving average crossover: golden cross and death cross detection.
//!
//! The 20-bar average above the 60-bar average is a golden cross, below it a
//! death cross. `signal_type` selects which to screen for:
//! 0 = golden cross, 1 = death cross, 2 = both. Other values read as 0.
//!
//! Parameters (switches are 0/1):
//! `signal_type`, `min_separation_pct`, `max_separation_pct`, `min_price`,
//! `max_price`, `min_volume`, `volume_confirmation`, `trend_confirmation`,
//! `rsi_filter`, `golden_rsi_min`, `golden_rsi_max`, `death_rsi_min`,
//! `death_rsi_max`, `macd_confirmation`, `avoid_penny_stocks`.

use serde::{Deserialize, Serialize};

use super::market::MarketContext;
use super::parameters::StrategyParameters;
use super::scoring::{unit, weighted, within, ListingGuard};
use super::{PriceLevels, Strategy};
use crate::domain::AnalyzedRecord;

const LISTING_GUARD: ListingGuard = ListingGuard {
    min_price: 3_000.0,
    min_volume: 50_000.0,
    max_price: None,
};

/// Separation band (percent) that scores best.
const OPTIMAL_SEPARATION: (f64, f64) = (3.0, 5.0);

/// Which crosses to screen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossSignal {
    GoldenCross,
    DeathCross,
    Both,
}

impl CrossSignal {
    pub fn from_code(code: f64) -> Self {
        match code.round() as i64 {
            1 => Self::DeathCross,
            2 => Self::Both,
            _ => Self::GoldenCross,
        }
    }

    pub fn code(self) -> f64 {
        match self {
            Self::GoldenCross => 0.0,
            Self::DeathCross => 1.0,
            Self::Both => 2.0,
        }
    }

    fn accepts(self, direction: Direction) -> bool {
        match self {
            Self::GoldenCross => direction == Direction::Golden,
            Self::DeathCross => direction == Direction::Death,
            Self::Both => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Golden,
    Death,
}

impl Direction {
    fn of(sma20: f64, sma60: f64) -> Option<Self> {
        if sma20 > sma60 {
            Some(Self::Golden)
        } else if sma20 < sma60 {
            Some(Self::Death)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossoverParams {
    pub signal_type: CrossSignal,
    pub min_separation_pct: f64,
    pub max_separation_pct: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub min_volume: f64,
    pub volume_confirmation: bool,
    pub trend_confirmation: bool,
    pub rsi_filter: bool,
    pub golden_rsi_min: f64,
    pub golden_rsi_max: f64,
    pub death_rsi_min: f64,
    pub death_rsi_max: f64,
    pub macd_confirmation: bool,
    pub avoid_penny_stocks: bool,
}

impl Default for MaCrossoverParams {
    fn default() -> Self {
        Self {
            signal_type: CrossSignal::GoldenCross,
            min_separation_pct: 1.0,
            max_separation_pct: 8.0,
            min_price: 2_000.0,
            max_price: 1_000_000.0,
            min_volume: 100_000.0,
            volume_confirmation: true,
            trend_confirmation: true,
            rsi_filter: true,
            golden_rsi_min: 30.0,
            golden_rsi_max: 75.0,
            death_rsi_min: 25.0,
            death_rsi_max: 70.0,
            macd_confirmation: true,
            avoid_penny_stocks: true,
        }
    }
}

impl MaCrossoverParams {
    pub fn resolve(params: &StrategyParameters) -> Self {
        let d = Self::default();
        Self {
            signal_type: params
                .get("signal_type")
                .map(CrossSignal::from_code)
                .unwrap_or(d.signal_type),
            min_separation_pct: params.get_or("min_separation_pct", d.min_separation_pct),
            max_separation_pct: params.get_or("max_separation_pct", d.max_separation_pct),
            min_price: params.get_or("min_price", d.min_price),
            max_price: params.get_or("max_price", d.max_price),
            min_volume: params.get_or("min_volume", d.min_volume),
            volume_confirmation: params.flag("volume_confirmation", d.volume_confirmation),
            trend_confirmation: params.flag("trend_confirmation", d.trend_confirmation),
            rsi_filter: params.flag("rsi_filter", d.rsi_filter),
            golden_rsi_min: params.get_or("golden_rsi_min", d.golden_rsi_min),
            golden_rsi_max: params.get_or("golden_rsi_max", d.golden_rsi_max),
            death_rsi_min: params.get_or("death_rsi_min", d.death_rsi_min),
            death_rsi_max: params.get_or("death_rsi_max", d.death_rsi_max),
            macd_confirmation: params.flag("macd_confirmation", d.macd_confirmation),
            avoid_penny_stocks: params.flag("avoid_penny_stocks", d.avoid_penny_stocks),
        }
    }

    pub fn to_parameters(&self) -> StrategyParameters {
        StrategyParameters::new()
            .with("signal_type", self.signal_type.code())
            .with("min_separation_pct", self.min_separation_pct)
            .with("max_separation_pct", self.max_separation_pct)
            .with("min_price", self.min_price)
            .with("max_price", self.max_price)
            .with("min_volume", self.min_volume)
            .with_flag("volume_confirmation", self.volume_confirmation)
            .with_flag("trend_confirmation", self.trend_confirmation)
            .with_flag("rsi_filter", self.rsi_filter)
            .with("golden_rsi_min", self.golden_rsi_min)
            .with("golden_rsi_max", self.golden_rsi_max)
            .with("death_rsi_min", self.death_rsi_min)
            .with("death_rsi_max", self.death_rsi_max)
            .with_flag("macd_confirmation", self.macd_confirmation)
            .with_flag("avoid_penny_stocks", self.avoid_penny_stocks)
    }

    fn rsi_range(&self, direction: Direction) -> (f64, f64) {
        match direction {
            Direction::Golden => (self.golden_rsi_min, self.golden_rsi_max),
            Direction::Death => (self.death_rsi_min, self.death_rsi_max),
        }
    }
}

struct Gated {
    direction: Direction,
    sma20: f64,
    sma60: f64,
    separation_pct: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MaCrossover;

impl MaCrossover {
    fn gate(record: &AnalyzedRecord, p: &MaCrossoverParams) -> Option<Gated> {
        let ind = &record.indicators;
        let sma20 = ind.sma_20?;
        let sma60 = ind.sma_60.filter(|&v| v > 0.0)?;
        let close = record.close();

        if !within(close, p.min_price, p.max_price) {
            return None;
        }
        let separation_pct = (sma20 - sma60).abs() / sma60 * 100.0;
        if !within(separation_pct, p.min_separation_pct, p.max_separation_pct) {
            return None;
        }
        let direction = Direction::of(sma20, sma60)?;
        if !p.signal_type.accepts(direction) {
            return None;
        }

        let trend_ok = match direction {
            Direction::Golden => close >= sma20 * 0.98,
            Direction::Death => close <= sma20 * 1.02,
        };
        let (rsi_min, rsi_max) = p.rsi_range(direction);
        let macd_ok = match (ind.macd, ind.macd_signal, direction) {
            (Some(macd), Some(_), Direction::Golden) => macd > -100.0,
            (Some(macd), Some(_), Direction::Death) => macd < 100.0,
            _ => true,
        };

        let passes = (!p.volume_confirmation || record.volume() >= p.min_volume)
            && (!p.trend_confirmation || trend_ok)
            && (!p.rsi_filter || ind.rsi_14.map_or(true, |rsi| within(rsi, rsi_min, rsi_max)))
            && (!p.macd_confirmation || macd_ok)
            && (!p.avoid_penny_stocks || LISTING_GUARD.passes(record));

        passes.then_some(Gated {
            direction,
            sma20,
            sma60,
            separation_pct,
        })
    }

    /// Price targets and stops for the cross the averages currently show.
    /// Empty when either average is missing or they are equal.
    pub fn target_levels(record: &AnalyzedRecord) -> PriceLevels {
        let ind = &record.indicators;
        let (Some(sma20), Some(sma60)) = (ind.sma_20, ind.sma_60) else {
            return PriceLevels::new();
        };
        let close = record.close();
        let levels: [(&str, f64); 4] = match Direction::of(sma20, sma60) {
            Some(Direction::Golden) => [
                ("target_1", close * 1.05),
                ("target_2", close * 1.10),
                ("support", sma20),
                ("stop_loss", sma60),
            ],
            Some(Direction::Death) => [
                ("target_1", close * 0.95),
                ("target_2", close * 0.90),
                ("resistance", sma20),
                ("stop_loss", sma60),
            ],
            None => return PriceLevels::new(),
        };
        levels
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

fn separation_score(separation_pct: f64, p: &MaCrossoverParams) -> f64 {
    let (optimal_min, optimal_max) = OPTIMAL_SEPARATION;
    if within(separation_pct, optimal_min, optimal_max) {
        1.0
    } else if separation_pct >= p.min_separation_pct && separation_pct < optimal_min {
        0.6 + (separation_pct - p.min_separation_pct) / (optimal_min - p.min_separation_pct) * 0.4
    } else if separation_pct > optimal_max && separation_pct <= p.max_separation_pct {
        1.0 - (separation_pct - optimal_max) / (p.max_separation_pct - optimal_max) * 0.3
    } else {
        0.3
    }
}

fn position_score(close: f64, gated: &Gated) -> f64 {
    let (beyond_fast, beyond_slow) = match gated.direction {
        Direction::Golden => (close > gated.sma20, close > gated.sma60),
        Direction::Death => (close < gated.sma20, close < gated.sma60),
    };
    let mut score = 0.0;
    if beyond_fast {
        score += 0.6;
    }
    if beyond_slow {
        score += 0.4;
    }
    f64::min(score, 1.0)
}

fn rsi_support(rsi: Option<f64>, direction: Direction, p: &MaCrossoverParams) -> f64 {
    let Some(rsi) = rsi else {
        return 0.5;
    };
    let (range_min, range_max) = p.rsi_range(direction);
    match direction {
        Direction::Golden => {
            if within(rsi, 40.0, 70.0) {
                1.0
            } else if rsi >= range_min && rsi < 40.0 {
                0.7
            } else if rsi > 70.0 && rsi <= range_max {
                0.6
            } else {
                0.3
            }
        }
        Direction::Death => {
            if within(rsi, 30.0, 60.0) {
                1.0
            } else if rsi >= range_min && rsi < 30.0 {
                0.6
            } else if rsi > 60.0 && rsi <= range_max {
                0.7
            } else {
                0.3
            }
        }
    }
}

fn macd_agreement(record: &AnalyzedRecord, direction: Direction) -> f64 {
    let ind = &record.indicators;
    let (Some(macd), Some(signal)) = (ind.macd, ind.macd_signal) else {
        return 0.5;
    };
    let agrees = match direction {
        Direction::Golden => macd > signal,
        Direction::Death => macd < signal,
    };
    if agrees {
        1.0
    } else {
        0.3
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        "moving_average_crossover"
    }

    fn description(&self) -> &str {
        "20-day and 60-day moving averages separated in the chosen cross direction, confirmed by price, RSI and MACD"
    }

    fn default_parameters(&self) -> StrategyParameters {
        MaCrossoverParams::default().to_parameters()
    }

    fn applies(&self, record: &AnalyzedRecord, params: &StrategyParameters) -> bool {
        Self::gate(record, &MaCrossoverParams::resolve(params)).is_some()
    }

    fn signal_strength(&self, record: &AnalyzedRecord, params: &StrategyParameters) -> f64 {
        let p = MaCrossoverParams::resolve(params);
        let Some(gated) = Self::gate(record, &p) else {
            return 0.0;
        };
        let context = MarketContext::from_record(record);

        let total = weighted(&[
            (0.40, separation_score(gated.separation_pct, &p)),
            (0.30, position_score(record.close(), &gated)),
            (0.15, rsi_support(record.indicators.rsi_14, gated.direction, &p)),
            (0.10, macd_agreement(record, gated.direction)),
            (0.05, context.score()),
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

    fn key_levels(&self, record: &AnalyzedRecord) -> PriceLevels {
        Self::target_levels(record)
    }
}
