//! Indicator period configuration.

use serde::{Deserialize, Serialize};

/// Windows used by the analyzer.
///
/// Changing a period does not rename the `IndicatorSet` field it feeds:
/// `sma_20` holds whatever `sma_medium` is set to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub sma_short: usize,
    pub sma_medium: usize,
    pub sma_long: usize,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
    pub bollinger_period: usize,
    pub bollinger_std: f64,
    pub stoch_k: usize,
    pub stoch_d: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_short: 5,
            sma_medium: 20,
            sma_long: 60,
            ema_fast: 12,
            ema_slow: 26,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            rsi_period: 14,
            bollinger_period: 20,
            bollinger_std: 2.0,
            stoch_k: 14,
            stoch_d: 3,
        }
    }
}

impl IndicatorConfig {
    /// Bars needed before every indicator has a value.
    pub fn full_warmup(&self) -> usize {
        [
            self.sma_short,
            self.sma_medium,
            self.sma_long,
            self.ema_fast,
            self.ema_slow,
            self.macd_fast.max(self.macd_slow) + self.macd_signal - 1,
            self.rsi_period + 1,
            self.bollinger_period,
            self.stoch_k + self.stoch_d - 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_warmup_is_long_sma() {
        assert_eq!(IndicatorConfig::default().full_warmup(), 60);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: IndicatorConfig = toml::from_str("rsi_period = 9").unwrap();
        assert_eq!(config.rsi_period, 9);
        assert_eq!(config.sma_long, 60);
        assert_eq!(config.bollinger_std, 2.0);
    }
}
