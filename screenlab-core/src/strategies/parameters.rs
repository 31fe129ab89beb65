//! Strategy parameter maps.
//!
//! Parameters are a flat, ordered `name -> f64` map so they serialize
//! cleanly to JSON and TOML. Switches are stored as 0/1 and enumerations as
//! small integers; each strategy documents its encoding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyParameters(BTreeMap<String, f64>);

impl StrategyParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_flag(self, name: impl Into<String>, value: bool) -> Self {
        self.with(name, if value { 1.0 } else { 0.0 })
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Extract a named parameter, falling back to `default`.
    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    /// Extract a switch: any non-zero value is on.
    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.get(name).map(|v| v != 0.0).unwrap_or(default)
    }

    /// A copy of `self` with every entry of `overrides` written over it.
    pub fn merged(&self, overrides: &StrategyParameters) -> StrategyParameters {
        let mut merged = self.clone();
        for (name, value) in overrides.iter() {
            merged.set(name, value);
        }
        merged
    }

    /// Names in `self` that `known` does not define, in sorted order.
    pub fn unknown_keys(&self, known: &StrategyParameters) -> Vec<&str> {
        self.0
            .keys()
            .filter(|name| !known.0.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, f64>> for StrategyParameters {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for StrategyParameters {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
