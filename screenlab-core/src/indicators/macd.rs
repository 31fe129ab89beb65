//! Moving Average Convergence Divergence (MACD).
//!
//! - MACD line: EMA(fast) - EMA(slow), where both are defined
//! - Signal line: EMA(signal) over the defined MACD values, re-expanded
//! - Histogram: MACD - signal, where both are defined
//!
//! With the default 12/26/9 the MACD line starts at index 25 and the signal
//! line at index 33.

use super::ema::ema;
use super::series::map_defined;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);

    let macd_line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let signal_line = map_defined(&macd_line, |compacted| ema(compacted, signal));

    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();

    MacdSeries {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}
