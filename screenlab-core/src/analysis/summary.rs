//! Latest-bar classification.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::AnalyzedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdTrend {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmaPosition {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPosition {
    AboveUpper,
    BelowLower,
    WithinBands,
}

/// Categorical labels. A label is absent when its inputs are missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalLabels {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd: Option<MacdTrend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<RsiZone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma_20: Option<SmaPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bollinger: Option<BandPosition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub sma_20: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub ticker: String,
    pub analysis_date: NaiveDate,
    pub current_price: f64,
    pub signals: SignalLabels,
    pub indicators: IndicatorSnapshot,
}

impl RsiZone {
    pub fn classify(rsi: f64) -> Self {
        if rsi > 70.0 {
            Self::Overbought
        } else if rsi < 30.0 {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }
}

impl AnalysisSummary {
    pub fn from_record(record: &AnalyzedRecord) -> Self {
        let ind = &record.indicators;
        let close = record.close();

        let signals = SignalLabels {
            macd: ind.macd.zip(ind.macd_signal).map(|(m, s)| {
                if m > s {
                    MacdTrend::Bullish
                } else {
                    MacdTrend::Bearish
                }
            }),
            rsi: ind.rsi_14.map(RsiZone::classify),
            sma_20: ind.sma_20.map(|sma| {
                if close > sma {
                    SmaPosition::Above
                } else {
                    SmaPosition::Below
                }
            }),
            bollinger: ind.bollinger_upper.zip(ind.bollinger_lower).map(|(upper, lower)| {
                if close > upper {
                    BandPosition::AboveUpper
                } else if close < lower {
                    BandPosition::BelowLower
                } else {
                    BandPosition::WithinBands
                }
            }),
        };

        Self {
            ticker: record.ticker.clone(),
            analysis_date: record.date,
            current_price: close,
            signals,
            indicators: IndicatorSnapshot {
                sma_20: ind.sma_20,
                rsi_14: ind.rsi_14,
                macd: ind.macd,
                macd_signal: ind.macd_signal,
            },
        }
    }
}

/// Summarize the most recent record. `None` for an empty slice.
pub fn summarize(records: &[AnalyzedRecord]) -> Option<AnalysisSummary> {
    records.last().map(AnalysisSummary::from_record)
}
