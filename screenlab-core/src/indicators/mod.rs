//! Indicator library.
//!
//! Every indicator is a pure function over a price slice that returns one
//! `Option<f64>` per input. An entry is `None` until the indicator's warm-up
//! window is satisfied; short inputs and zero windows yield all-`None` output
//! rather than an error.
//!
//! Multi-series indicators (MACD, Bollinger, Stochastic) return a struct of
//! aligned series.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod series;
pub mod sma;
pub mod stochastic;

pub use bollinger::{bollinger, BollingerBands};
pub use ema::ema;
pub use macd::{macd, MacdSeries};
pub use rsi::rsi;
pub use series::map_defined;
pub use sma::sma;
pub use stochastic::{stochastic, StochasticSeries};

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
