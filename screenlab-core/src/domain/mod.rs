//! Domain types for ScreenLab

pub mod bar;
pub mod indicator_set;
pub mod record;

pub use bar::{Bar, BarError};
pub use indicator_set::IndicatorSet;
pub use record::{AnalyzedRecord, RecordError};

/// Ticker type alias
pub type Ticker = String;
