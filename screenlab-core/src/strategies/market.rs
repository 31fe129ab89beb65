//! Market context shared by every strategy.
//!
//! Buckets use absolute KRW thresholds with strict `>` comparisons. Large-cap
//! status is approximated from traded volume since market cap is not part of
//! a bar.

use serde::{Deserialize, Serialize};

use crate::domain::AnalyzedRecord;

pub const LARGE_CAP_MIN_VOLUME: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeCategory {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceRange {
    Premium,
    High,
    Medium,
    Low,
    Penny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketContext {
    pub is_large_cap: bool,
    pub volume_category: VolumeCategory,
    pub price_range: PriceRange,
}

impl VolumeCategory {
    pub fn classify(volume: f64) -> Self {
        if volume > 10_000_000.0 {
            Self::VeryHigh
        } else if volume > 5_000_000.0 {
            Self::High
        } else if volume > 1_000_000.0 {
            Self::Medium
        } else if volume > 100_000.0 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }
}

impl PriceRange {
    pub fn classify(price: f64) -> Self {
        if price > 500_000.0 {
            Self::Premium
        } else if price > 100_000.0 {
            Self::High
        } else if price > 50_000.0 {
            Self::Medium
        } else if price > 10_000.0 {
            Self::Low
        } else {
            Self::Penny
        }
    }
}

impl MarketContext {
    pub fn new(close: f64, volume: f64) -> Self {
        Self {
            is_large_cap: volume > LARGE_CAP_MIN_VOLUME,
            volume_category: VolumeCategory::classify(volume),
            price_range: PriceRange::classify(close),
        }
    }

    pub fn from_record(record: &AnalyzedRecord) -> Self {
        Self::new(record.close(), record.volume())
    }

    /// High or very high volume.
    pub fn heavy_volume(&self) -> bool {
        matches!(
            self.volume_category,
            VolumeCategory::High | VolumeCategory::VeryHigh
        )
    }

    /// Market-fit score in [0.5, 1.0].
    ///
    /// Only the `High` volume bucket earns the full volume bonus; `VeryHigh`
    /// earns none.
    pub fn score(&self) -> f64 {
        let mut score = 0.5;
        if self.is_large_cap {
            score += 0.2;
        }
        match self.volume_category {
            VolumeCategory::High => score += 0.2,
            VolumeCategory::Medium => score += 0.1,
            _ => {}
        }
        if matches!(self.price_range, PriceRange::Medium | PriceRange::High) {
            score += 0.1;
        }
        f64::min(score, 1.0)
    }
}
