//! Run fingerprinting: deterministic identification of a parameter set and
//! the bar series it was run against.
//!
//! - `ConfigHash`: exact identity of a `StrategyConfig` (every field).
//! - `DatasetHash`: identity of an ordered bar sequence.
//! - `RunFingerprint`: both of the above plus the processed bar count, enough
//!   to tell two replays apart when comparing factor-weight sweeps.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::StrategyConfig;
use crate::domain::Bar;

/// BLAKE3 hex digest of a config's canonical JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn of(config: &StrategyConfig) -> Self {
        // BTreeMap-backed fields keep the JSON key order stable.
        let canonical = serde_json::to_string(config).unwrap_or_default();
        Self(blake3::hash(canonical.as_bytes()).to_hex().to_string())
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// BLAKE3 hex digest over every bar's timestamp and OHLCV, in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn of(bars: &[Bar]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for bar in bars {
            hasher.update(&bar.timestamp.and_utc().timestamp().to_le_bytes());
            for value in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
                hasher.update(&value.to_bits().to_le_bytes());
            }
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
    pub bar_count: usize,
}

impl RunFingerprint {
    pub fn new(config: &StrategyConfig, bars: &[Bar]) -> Self {
        Self {
            config_hash: ConfigHash::of(config),
            dataset_hash: DatasetHash::of(bars),
            bar_count: bars.len(),
        }
    }

    /// Single combined digest, stable across builds and platforms.
    pub fn hash(&self) -> String {
        let canonical = serde_json::json!({
            "config_hash": &self.config_hash.0,
            "dataset_hash": &self.dataset_hash.0,
            "bar_count": self.bar_count,
        });
        blake3::hash(canonical.to_string().as_bytes())
            .to_hex()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FactorType;
    use chrono::NaiveDate;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::new(
                    start + chrono::Duration::hours(i as i64),
                    c,
                    c + 0.001,
                    c - 0.001,
                    c,
                    100.0,
                )
            })
            .collect()
    }

    #[test]
    fn config_hash_is_deterministic() {
        let a = ConfigHash::of(&StrategyConfig::default());
        let b = ConfigHash::of(&StrategyConfig::default());
        assert_eq!(a, b);
        assert_eq!(a.0.len(), 64);
    }

    #[test]
    fn config_hash_differs_for_different_weights() {
        let mut tweaked = StrategyConfig::default();
        tweaked.factor_weights.set(FactorType::Doji, 0.0);
        assert_ne!(
            ConfigHash::of(&StrategyConfig::default()),
            ConfigHash::of(&tweaked)
        );
    }

    #[test]
    fn dataset_hash_tracks_every_bar() {
        let a = DatasetHash::of(&bars(&[1.0, 1.1, 1.2]));
        let b = DatasetHash::of(&bars(&[1.0, 1.1, 1.2]));
        let c = DatasetHash::of(&bars(&[1.0, 1.1, 1.2001]));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn run_hash_changes_with_bar_count() {
        let config = StrategyConfig::default();
        let series = bars(&[1.0, 1.1, 1.2, 1.3]);
        let full = RunFingerprint::new(&config, &series);
        let partial = RunFingerprint::new(&config, &series[..3]);
        assert_eq!(full.hash(), RunFingerprint::new(&config, &series).hash());
        assert_ne!(full.hash(), partial.hash());
    }
}
