//! Analyzed record: one bar joined with its indicator snapshot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Bar, BarError, IndicatorSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub bar: Bar,
    pub indicators: IndicatorSet,
}

/// Why a record cannot be screened.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("invalid bar: {0}")]
    InvalidBar(#[from] BarError),
    #[error("bar belongs to {bar_ticker}, record to {record_ticker}")]
    TickerMismatch {
        record_ticker: String,
        bar_ticker: String,
    },
}

impl AnalyzedRecord {
    pub fn new(bar: Bar, indicators: IndicatorSet) -> Self {
        Self {
            date: bar.date,
            ticker: bar.ticker.clone(),
            bar,
            indicators,
        }
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }

    pub fn volume(&self) -> f64 {
        self.bar.volume as f64
    }

    /// Check that the bar is well-formed and belongs to this record's ticker.
    pub fn validate(&self) -> Result<(), RecordError> {
        self.bar.validate()?;
        if self.bar.ticker != self.ticker {
            return Err(RecordError::TickerMismatch {
                record_ticker: self.ticker.clone(),
                bar_ticker: self.bar.ticker.clone(),
            });
        }
        Ok(())
    }
}
