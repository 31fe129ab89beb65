//! Screening configuration file.
//!
//! ```toml
//! [indicators]
//! rsi_period = 14
//!
//! [screen]
//! limit = 50
//! limit_per_strategy = 20
//!
//! [parameters.macd_golden_cross]
//! min_histogram = 30.0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analysis::IndicatorConfig;
use crate::strategies::StrategyParameters;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenSettings {
    pub limit: usize,
    pub limit_per_strategy: usize,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            limit: 50,
            limit_per_strategy: 20,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub indicators: IndicatorConfig,
    pub screen: ScreenSettings,
    /// Parameter overrides keyed by strategy id.
    pub parameters: BTreeMap<String, StrategyParameters>,
}

impl ScreenConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let ind = &self.indicators;
        let periods = [
            ("sma_short", ind.sma_short),
            ("sma_medium", ind.sma_medium),
            ("sma_long", ind.sma_long),
            ("ema_fast", ind.ema_fast),
            ("ema_slow", ind.ema_slow),
            ("macd_fast", ind.macd_fast),
            ("macd_slow", ind.macd_slow),
            ("macd_signal", ind.macd_signal),
            ("rsi_period", ind.rsi_period),
            ("bollinger_period", ind.bollinger_period),
            ("stoch_k", ind.stoch_k),
            ("stoch_d", ind.stoch_d),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, period)| *period == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be >= 1")));
        }
        if ind.macd_fast >= ind.macd_slow {
            return Err(ConfigError::Invalid(
                "macd_fast must be shorter than macd_slow".into(),
            ));
        }
        if !(ind.bollinger_std.is_finite() && ind.bollinger_std > 0.0) {
            return Err(ConfigError::Invalid(
                "bollinger_std must be a positive number".into(),
            ));
        }
        Ok(())
    }

    /// Overrides configured for `strategy`, empty when none are set.
    pub fn overrides_for(&self, strategy: &str) -> StrategyParameters {
        self.parameters
            .get(&strategy.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_is_default() {
        let config = ScreenConfig::from_toml("").unwrap();
        assert_eq!(config, ScreenConfig::default());
        assert_eq!(config.screen.limit, 50);
    }

    #[test]
    fn parses_sections() {
        let config = ScreenConfig::from_toml(
            r#"
[indicators]
rsi_period = 9

[screen]
limit = 5

[parameters.macd_golden_cross]
min_histogram = 30.0
avoid_penny_stocks = 0.0
"#,
        )
        .unwrap();
        assert_eq!(config.indicators.rsi_period, 9);
        assert_eq!(config.screen.limit, 5);
        assert_eq!(config.screen.limit_per_strategy, 20);
        let overrides = config.overrides_for("MACD_GOLDEN_CROSS");
        assert_eq!(overrides.get("min_histogram"), Some(30.0));
        assert!(!overrides.flag("avoid_penny_stocks", true));
        assert!(config.overrides_for("rsi_oversold").is_empty());
    }

    #[test]
    fn rejects_zero_period() {
        let err = ScreenConfig::from_toml("[indicators]\nsma_long = 0").unwrap_err();
        assert!(err.to_string().contains("sma_long"));
    }

    #[test]
    fn rejects_inverted_macd() {
        let err =
            ScreenConfig::from_toml("[indicators]\nmacd_fast = 30\nmacd_slow = 26").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(
            ScreenConfig::from_toml("[screen\nlimit = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[screen]\nlimit = 3").unwrap();
        let config = ScreenConfig::from_file(file.path()).unwrap();
        assert_eq!(config.screen.limit, 3);

        let missing = ScreenConfig::from_file(Path::new("/nonexistent/screenlab.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
