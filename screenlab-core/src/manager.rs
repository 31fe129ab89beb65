//! Strategy manager: registry, batch validation, and ranked screening.
//!
//! The registry is keyed by lower-case strategy id so lookups are
//! case-insensitive. Screening never mutates a registered strategy: overrides
//! are merged into a fresh copy of the defaults for each call.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::domain::{AnalyzedRecord, RecordError};
use crate::strategies::{default_strategies, ScreeningResult, Strategy, StrategyParameters};

/// Per-record error messages kept in a batch.
pub const MAX_REPORTED_ERRORS: usize = 10;
/// Invalid-record details kept in a validation report.
pub const MAX_INVALID_DETAILS: usize = 5;

// ─── Error type ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScreenError {
    #[error("Unknown strategy: {name} (available: {})", .available.join(", "))]
    UnknownStrategy {
        name: String,
        available: Vec<String>,
    },
}

// ─── Reports ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub name: String,
    pub description: String,
    pub parameters: StrategyParameters,
}

/// Ranked matches of one strategy over a batch of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningBatch {
    pub strategy_name: String,
    pub total_analyzed: usize,
    pub matches_found: usize,
    pub results_returned: usize,
    pub results: Vec<ScreeningResult>,
    /// `"<ticker>: <reason>"` for the first skipped records.
    pub errors: Vec<String>,
    pub skipped: usize,
    pub parameters_used: StrategyParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StrategyOutcome {
    Completed(ScreeningBatch),
    Failed {
        error: String,
        available: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRun {
    pub strategy: String,
    pub outcome: StrategyOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiStrategyReport {
    pub runs: Vec<StrategyRun>,
    pub strategies_analyzed: usize,
    pub successful_strategies: usize,
    pub total_matches_found: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidRecord {
    pub ticker: String,
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub invalid_details: Vec<InvalidRecord>,
    /// valid / total, 0 for an empty batch.
    pub validation_rate: f64,
}

// ─── Manager ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StrategyManager {
    strategies: BTreeMap<String, Box<dyn Strategy>>,
}

fn display_ticker(record: &AnalyzedRecord) -> &str {
    if record.ticker.trim().is_empty() {
        "<unknown>"
    } else {
        &record.ticker
    }
}

impl StrategyManager {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in strategies.
    pub fn with_default_strategies() -> Self {
        let mut manager = Self::new();
        for strategy in default_strategies() {
            manager.register(strategy);
        }
        manager
    }

    /// Register a strategy under its lower-cased name, replacing any
    /// strategy already registered under that name.
    pub fn register(&mut self, strategy: Box<dyn Strategy>) {
        let key = strategy.name().to_lowercase();
        debug!(strategy = %key, "registered strategy");
        self.strategies.insert(key, strategy);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Strategy> {
        self.strategies
            .get(&name.to_lowercase())
            .map(|s| s.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.strategies.keys().cloned().collect()
    }

    pub fn list(&self) -> Vec<StrategyInfo> {
        self.strategies
            .values()
            .map(|s| StrategyInfo {
                name: s.name().to_string(),
                description: s.description().to_string(),
                parameters: s.default_parameters(),
            })
            .collect()
    }

    fn unknown(&self, name: &str) -> ScreenError {
        ScreenError::UnknownStrategy {
            name: name.to_string(),
            available: self.names(),
        }
    }

    /// Check that a record can be screened: ticker present and OHLC
    /// consistent. Warm-up rows with no indicator values are valid; strategies
    /// treat missing values as insufficient data.
    pub fn validate_record(&self, record: &AnalyzedRecord) -> Result<(), RecordError> {
        record.validate()
    }

    /// Check every record and report the failures.
    pub fn validate_batch(&self, records: &[AnalyzedRecord]) -> ValidationReport {
        let mut invalid = 0;
        let mut invalid_details = Vec::new();
        for record in records {
            if let Err(err) = self.validate_record(record) {
                invalid += 1;
                if invalid_details.len() < MAX_INVALID_DETAILS {
                    invalid_details.push(InvalidRecord {
                        ticker: display_ticker(record).to_string(),
                        date: record.date,
                        reason: err.to_string(),
                    });
                }
            }
        }
        let total = records.len();
        let valid = total - invalid;
        ValidationReport {
            total,
            valid,
            invalid,
            invalid_details,
            validation_rate: if total == 0 {
                0.0
            } else {
                valid as f64 / total as f64
            },
        }
    }

    /// Screen `records` with one strategy.
    ///
    /// Invalid records are skipped and reported. Matches are ranked by signal
    /// strength, strongest first; ties keep input order. At most `limit`
    /// results are returned.
    pub fn screen(
        &self,
        name: &str,
        records: &[AnalyzedRecord],
        overrides: &StrategyParameters,
        limit: usize,
    ) -> Result<ScreeningBatch, ScreenError> {
        let strategy = self.get(name).ok_or_else(|| self.unknown(name))?;
        let defaults = strategy.default_parameters();
        for unknown in overrides.unknown_keys(&defaults) {
            warn!(
                strategy = strategy.name(),
                parameter = unknown,
                "parameter override not used by strategy"
            );
        }
        let params = defaults.merged(overrides);

        let mut errors = Vec::new();
        let mut skipped = 0;
        let valid: Vec<&AnalyzedRecord> = records
            .iter()
            .filter(|record| match self.validate_record(record) {
                Ok(()) => true,
                Err(err) => {
                    skipped += 1;
                    warn!(
                        strategy = strategy.name(),
                        ticker = display_ticker(record),
                        date = %record.date,
                        error = %err,
                        "skipping invalid record"
                    );
                    if errors.len() < MAX_REPORTED_ERRORS {
                        errors.push(format!("{}: {err}", display_ticker(record)));
                    }
                    false
                }
            })
            .collect();

        let mut results: Vec<ScreeningResult> = valid
            .par_iter()
            .map(|record| strategy.evaluate(record, &params))
            .filter(|result| result.applies)
            .collect();

        results.sort_by(|a, b| b.signal_strength.total_cmp(&a.signal_strength));
        let matches_found = results.len();
        results.truncate(limit);

        debug!(
            strategy = strategy.name(),
            analyzed = records.len(),
            skipped,
            matches = matches_found,
            returned = results.len(),
            "screened records"
        );

        Ok(ScreeningBatch {
            strategy_name: strategy.name().to_string(),
            total_analyzed: records.len(),
            matches_found,
            results_returned: results.len(),
            results,
            errors,
            skipped,
            parameters_used: params,
        })
    }

    /// Screen `records` with several strategies, each at its defaults.
    /// An unknown name fails only its own run.
    pub fn screen_many<S: AsRef<str>>(
        &self,
        names: &[S],
        records: &[AnalyzedRecord],
        limit_per_strategy: usize,
    ) -> MultiStrategyReport {
        let no_overrides = StrategyParameters::new();
        let runs: Vec<StrategyRun> = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let outcome = match self.screen(name, records, &no_overrides, limit_per_strategy) {
                    Ok(batch) => StrategyOutcome::Completed(batch),
                    Err(err) => {
                        let ScreenError::UnknownStrategy { ref available, .. } = err;
                        StrategyOutcome::Failed {
                            error: err.to_string(),
                            available: available.clone(),
                        }
                    }
                };
                StrategyRun {
                    strategy: name.to_string(),
                    outcome,
                }
            })
            .collect();

        let completed = runs.iter().filter_map(|run| match &run.outcome {
            StrategyOutcome::Completed(batch) => Some(batch),
            StrategyOutcome::Failed { .. } => None,
        });
        let (successful_strategies, total_matches_found) = completed
            .fold((0, 0), |(count, matches), batch| {
                (count + 1, matches + batch.matches_found)
            });

        MultiStrategyReport {
            strategies_analyzed: runs.len(),
            successful_strategies,
            total_matches_found,
            runs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{make_bars, Analyzer};
    use crate::domain::{Bar, IndicatorSet};

    fn record(ticker: &str, close: f64, hist: f64) -> AnalyzedRecord {
        let bar = Bar {
            ticker: ticker.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 2_000_000,
        };
        AnalyzedRecord::new(
            bar,
            IndicatorSet {
                macd: Some(hist + 50.0),
                macd_signal: Some(50.0),
                macd_histogram: Some(hist),
                rsi_14: Some(57.5),
                sma_5: Some(close * 0.99),
                sma_20: Some(close * 0.98),
                sma_60: Some(close * 0.95),
                ..Default::default()
            },
        )
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let manager = StrategyManager::with_default_strategies();
        assert!(manager.get("MACD_Golden_Cross").is_some());
        assert!(manager.get("nope").is_none());
        assert_eq!(manager.names().len(), 4);
        assert_eq!(manager.list().len(), 4);
    }

    #[test]
    fn unknown_strategy_lists_available() {
        let manager = StrategyManager::with_default_strategies();
        let err = manager
            .screen("nope", &[], &StrategyParameters::new(), 10)
            .unwrap_err();
        let ScreenError::UnknownStrategy { name, available } = &err;
        assert_eq!(name, "nope");
        assert!(available.contains(&"rsi_oversold".to_string()));
        assert!(err.to_string().contains("macd_golden_cross"));
    }

    #[test]
    fn results_are_ranked_and_limited() {
        let manager = StrategyManager::with_default_strategies();
        let records = vec![
            record("A", 20_000.0, 60.0),
            record("B", 20_000.0, 100.0),
            record("C", 20_000.0, 80.0),
        ];
        let batch = manager
            .screen("macd_golden_cross", &records, &StrategyParameters::new(), 2)
            .unwrap();
        assert_eq!(batch.total_analyzed, 3);
        assert_eq!(batch.matches_found, 3);
        assert_eq!(batch.results_returned, 2);
        let tickers: Vec<&str> = batch.results.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, ["B", "C"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let manager = StrategyManager::with_default_strategies();
        let records = vec![record("X", 20_000.0, 120.0), record("Y", 20_000.0, 150.0)];
        let batch = manager
            .screen("macd_golden_cross", &records, &StrategyParameters::new(), 10)
            .unwrap();
        assert_eq!(
            batch.results[0].signal_strength,
            batch.results[1].signal_strength
        );
        assert_eq!(batch.results[0].ticker, "X");
    }

    #[test]
    fn invalid_records_are_skipped_and_reported() {
        let manager = StrategyManager::with_default_strategies();
        let mut broken = record("BAD", 20_000.0, 100.0);
        broken.bar.high = 1.0;
        let mut orphan = record("ORPHAN", 20_000.0, 100.0);
        orphan.ticker = "OTHER".into();
        let records = vec![broken, orphan, record("OK", 20_000.0, 100.0)];

        let batch = manager
            .screen("macd_golden_cross", &records, &StrategyParameters::new(), 10)
            .unwrap();
        assert_eq!(batch.skipped, 2);
        assert_eq!(batch.errors.len(), 2);
        assert!(batch.errors[0].starts_with("BAD: "));
        assert!(batch.errors[1].starts_with("OTHER: "));
        assert_eq!(batch.matches_found, 1);
    }

    #[test]
    fn error_list_is_capped() {
        let manager = StrategyManager::with_default_strategies();
        let records: Vec<AnalyzedRecord> = (0..15)
            .map(|i| {
                let mut r = record(&format!("T{i}"), 20_000.0, 100.0);
                r.bar.low = r.bar.high * 2.0;
                r
            })
            .collect();
        let batch = manager
            .screen("rsi_oversold", &records, &StrategyParameters::new(), 10)
            .unwrap();
        assert_eq!(batch.skipped, 15);
        assert_eq!(batch.errors.len(), MAX_REPORTED_ERRORS);
    }

    #[test]
    fn warmup_rows_are_screened_without_errors() {
        let manager = StrategyManager::with_default_strategies();
        let analyzer = Analyzer::default();
        let closes: Vec<f64> = (0..30).map(|i| 20_000.0 + i as f64 * 40.0).collect();
        let records: Vec<AnalyzedRecord> = ["000001", "000002", "000003"]
            .iter()
            .flat_map(|ticker| {
                let bars: Vec<_> = make_bars(&closes)
                    .into_iter()
                    .map(|mut bar| {
                        bar.ticker = ticker.to_string();
                        bar
                    })
                    .collect();
                analyzer.analyze(&bars)
            })
            .collect();
        assert!(records[0].indicators.is_empty());

        for name in manager.names() {
            let batch = manager
                .screen(&name, &records, &StrategyParameters::new(), 10)
                .unwrap();
            assert_eq!(batch.total_analyzed, 90);
            assert_eq!(batch.skipped, 0, "{name}");
            assert!(batch.errors.is_empty(), "{name}: {:?}", batch.errors);
        }
        assert_eq!(manager.validate_batch(&records).invalid, 0);
    }

    #[test]
    fn overrides_apply_per_call_only() {
        let manager = StrategyManager::with_default_strategies();
        let records = vec![record("A", 20_000.0, 60.0)];
        let strict = StrategyParameters::new().with("min_histogram", 70.0);

        let batch = manager
            .screen("macd_golden_cross", &records, &strict, 10)
            .unwrap();
        assert_eq!(batch.matches_found, 0);
        assert_eq!(batch.parameters_used.get("min_histogram"), Some(70.0));

        let batch = manager
            .screen("macd_golden_cross", &records, &StrategyParameters::new(), 10)
            .unwrap();
        assert_eq!(batch.matches_found, 1);
        assert_eq!(batch.parameters_used.get("min_histogram"), Some(50.0));
    }

    #[test]
    fn screen_many_counts_outcomes() {
        let manager = StrategyManager::with_default_strategies();
        let records = vec![record("A", 20_000.0, 100.0)];
        let report = manager.screen_many(&["macd_golden_cross", "bogus", "rsi_oversold"], &records, 5);
        assert_eq!(report.strategies_analyzed, 3);
        assert_eq!(report.successful_strategies, 2);
        assert_eq!(report.total_matches_found, 1);
        assert!(matches!(
            report.runs[1].outcome,
            StrategyOutcome::Failed { .. }
        ));
    }

    #[test]
    fn validation_report_counts_and_caps_details() {
        let manager = StrategyManager::with_default_strategies();
        let mut records: Vec<AnalyzedRecord> = (0..7)
            .map(|i| {
                let mut r = record(&format!("T{i}"), 20_000.0, 100.0);
                r.bar.low = r.bar.high * 2.0;
                r
            })
            .collect();
        records.push(record("OK", 20_000.0, 100.0));

        let report = manager.validate_batch(&records);
        assert_eq!(report.total, 8);
        assert_eq!(report.valid, 1);
        assert_eq!(report.invalid, 7);
        assert_eq!(report.invalid_details.len(), MAX_INVALID_DETAILS);
        assert_eq!(report.validation_rate, 0.125);
        assert_eq!(manager.validate_batch(&[]).validation_rate, 0.0);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = StrategyOutcome::Failed {
            error: "Unknown strategy: x".into(),
            available: vec!["rsi_oversold".into()],
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
    }
}
