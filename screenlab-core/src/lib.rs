//! ScreenLab Core: indicator library, analysis, strategy scoring and screening.
//!
//! This crate contains the heart of the screener:
//! - Domain types (bars, indicator sets, analyzed records)
//! - Indicator library over price slices with `None` warm-up
//! - Analysis aggregator: per-date indicator suite, summary, pattern report
//! - Stateless, parameterized strategies with a 0–1 signal strength
//! - Strategy manager: registry, validation, ranked screening
//! - TOML configuration and CSV bar loading

pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod manager;
pub mod strategies;

pub use analysis::{Analyzer, IndicatorConfig};
pub use config::ScreenConfig;
pub use domain::{AnalyzedRecord, Bar, IndicatorSet};
pub use manager::{ScreenError, ScreeningBatch, StrategyManager};
pub use strategies::{ScreeningResult, Strategy, StrategyParameters};
