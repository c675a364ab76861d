//! Strategy configuration: every threshold the pipeline uses.
//!
//! Loaded from TOML (or built in code from `Default`) and validated once,
//! before any bar is processed. Nothing downstream falls back to a constant
//! that cannot be overridden here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::domain::{FactorType, Reliability, ZoneStrength};
use crate::fingerprint::ConfigHash;

/// Configuration load/validation failures. All are raised before processing starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: `{field}` {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown factor type `{0}` in factor_weights")]
    UnknownFactor(String),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// -- Factor weights ----------------------------------

impl FactorType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FibonacciLevel => "fibonacci_level",
            Self::VolumeSpike => "volume_spike",
            Self::Hammer => "hammer",
            Self::Engulfing => "engulfing",
            Self::Doji => "doji",
            Self::PinBar => "pin_bar",
            Self::PatternCompletion => "pattern_completion",
        }
    }
}

impl std::str::FromStr for FactorType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FactorType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownFactor(s.to_string()))
    }
}

/// Weight per factor type. A type missing from the table has weight 0 and
/// its detector is disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct FactorWeights(BTreeMap<FactorType, f64>);

impl FactorWeights {
    pub fn new(weights: impl IntoIterator<Item = (FactorType, f64)>) -> Self {
        Self(weights.into_iter().collect())
    }

    /// All factors disabled.
    pub fn none() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, factor_type: FactorType) -> f64 {
        self.0.get(&factor_type).copied().unwrap_or(0.0)
    }

    pub fn is_enabled(&self, factor_type: FactorType) -> bool {
        self.get(factor_type) > 0.0
    }

    pub fn set(&mut self, factor_type: FactorType, weight: f64) {
        self.0.insert(factor_type, weight);
    }

    pub fn iter(&self) -> impl Iterator<Item = (FactorType, f64)> + '_ {
        self.0.iter().map(|(&t, &w)| (t, w))
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self::new([
            (FactorType::FibonacciLevel, 1.0),
            (FactorType::VolumeSpike, 0.8),
            (FactorType::Hammer, 0.7),
            (FactorType::Engulfing, 0.9),
            (FactorType::Doji, 0.4),
            (FactorType::PinBar, 0.8),
            (FactorType::PatternCompletion, 1.0),
        ])
    }
}

impl TryFrom<BTreeMap<String, f64>> for FactorWeights {
    type Error = ConfigError;

    fn try_from(raw: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        raw.into_iter()
            .map(|(name, weight)| Ok((name.parse::<FactorType>()?, weight)))
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()
            .map(Self)
    }
}

impl From<FactorWeights> for BTreeMap<String, f64> {
    fn from(weights: FactorWeights) -> Self {
        weights
            .0
            .into_iter()
            .map(|(t, w)| (t.as_str().to_string(), w))
            .collect()
    }
}

// -- Sub-sections -----------------------------------

/// Banding of a zone's weighted score into weak / moderate / strong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthBands {
    pub moderate_min: f64,
    pub strong_min: f64,
}

impl Default for StrengthBands {
    fn default() -> Self {
        Self {
            moderate_min: 1.0,
            strong_min: 2.0,
        }
    }
}

impl StrengthBands {
    pub fn classify(&self, weighted_score: f64) -> ZoneStrength {
        if weighted_score >= self.strong_min {
            ZoneStrength::Strong
        } else if weighted_score >= self.moderate_min {
            ZoneStrength::Moderate
        } else {
            ZoneStrength::Weak
        }
    }
}

/// Cut-offs grading a detector reading into a reliability band. Readings
/// below `moderate` are weak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityCuts {
    pub moderate: f64,
    pub strong: f64,
}

impl ReliabilityCuts {
    pub fn grade(&self, reading: f64) -> Reliability {
        if reading >= self.strong {
            Reliability::Strong
        } else if reading >= self.moderate {
            Reliability::Moderate
        } else {
            Reliability::Weak
        }
    }

    fn check(&self, field: &'static str) -> Result<(), ConfigError> {
        if !(self.moderate.is_finite() && self.strong.is_finite())
            || self.moderate < 0.0
            || self.moderate > self.strong
        {
            return Err(invalid(field, "must satisfy 0 <= moderate <= strong"));
        }
        Ok(())
    }
}

/// Factor confidence assigned to each reliability band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfidence {
    pub weak: f64,
    pub moderate: f64,
    pub strong: f64,
}

impl Default for ReliabilityConfidence {
    fn default() -> Self {
        Self {
            weak: 0.4,
            moderate: 0.65,
            strong: 0.9,
        }
    }
}

impl ReliabilityConfidence {
    pub fn of(&self, reliability: Reliability) -> f64 {
        match reliability {
            Reliability::Weak => self.weak,
            Reliability::Moderate => self.moderate,
            Reliability::Strong => self.strong,
        }
    }
}

/// Candlestick shape thresholds and their reliability grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandleRules {
    /// Long shadow at least this multiple of the body for a hammer.
    pub hammer_shadow_ratio: f64,
    /// Body below this fraction of the range for a doji.
    pub doji_body_ratio: f64,
    /// One shadow at least this fraction of the range for a pin bar.
    pub pin_shadow_ratio: f64,
    /// Graded on shadow / body.
    pub hammer_reliability: ReliabilityCuts,
    /// Graded on shadow / range.
    pub pin_reliability: ReliabilityCuts,
    /// Engulfing body / engulfed body at or above which engulfing is strong.
    pub engulfing_strong_multiple: f64,
}

impl Default for CandleRules {
    fn default() -> Self {
        Self {
            hammer_shadow_ratio: 2.0,
            doji_body_ratio: 0.05,
            pin_shadow_ratio: 0.66,
            hammer_reliability: ReliabilityCuts {
                moderate: 3.0,
                strong: 4.0,
            },
            pin_reliability: ReliabilityCuts {
                moderate: 0.72,
                strong: 0.8,
            },
            engulfing_strong_multiple: 2.0,
        }
    }
}

/// A Wave C / Wave A ratio worth `score` when C lands on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveCTarget {
    pub ratio: f64,
    pub score: f64,
}

/// Ratio windows and scoring bands for A-B-C detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternRules {
    /// Accepted |B| / |A| range.
    pub wave_b_min: f64,
    pub wave_b_max: f64,
    /// Accepted |C| / |A| range.
    pub wave_c_min: f64,
    pub wave_c_max: f64,
    /// The "ideal" Wave B retracement band.
    pub ideal_b_low: f64,
    pub ideal_b_high: f64,
    /// Absolute ratio distance counted as "at" a target ratio.
    pub ratio_tolerance: f64,
    /// |B| / |A| at or above which a pattern is classified FLAT.
    pub flat_b_min: f64,
    /// Maximum number of 4-extremum windows scored per detection.
    pub scan_depth: usize,
    /// Quality score for a complete pattern.
    pub complete_score: f64,
    /// Wave B score inside the ideal band, within one tolerance of it, and
    /// within two.
    pub ideal_b_score: f64,
    pub near_ideal_b_score: f64,
    pub acceptable_b_score: f64,
    /// Bonus when Wave C ends on a retracement level of the reference swing.
    pub fib_confluence_score: f64,
    pub wave_c_targets: Vec<WaveCTarget>,
}

impl Default for PatternRules {
    fn default() -> Self {
        Self {
            wave_b_min: 0.236,
            wave_b_max: 1.382,
            wave_c_min: 0.618,
            wave_c_max: 2.618,
            ideal_b_low: 0.5,
            ideal_b_high: 0.618,
            ratio_tolerance: 0.05,
            flat_b_min: 0.9,
            scan_depth: 8,
            complete_score: 0.3,
            ideal_b_score: 0.3,
            near_ideal_b_score: 0.25,
            acceptable_b_score: 0.2,
            fib_confluence_score: 0.1,
            wave_c_targets: vec![
                WaveCTarget {
                    ratio: 1.0,
                    score: 0.3,
                },
                WaveCTarget {
                    ratio: 0.618,
                    score: 0.25,
                },
                WaveCTarget {
                    ratio: 1.272,
                    score: 0.25,
                },
            ],
        }
    }
}

/// Which prices of a bar count as touching a stop or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchPolicy {
    /// Bar high/low. Stop wins when both are touched on one bar.
    HighLow,
    /// Bar close only.
    Close,
}

// -- Strategy config ---------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Bars required on each side of a fractal (window = 2w + 1).
    pub extremum_half_window: usize,
    /// Swings ending more than this many bars ago no longer compete for dominance.
    pub swing_lookback_bars: usize,
    pub retracement_ratios: Vec<f64>,
    pub extension_ratios: Vec<f64>,
    /// Relative distance at which a price "touches" a level.
    pub fib_tolerance: f64,
    /// Relative price distance within which factors cluster.
    pub confluence_distance: f64,
    pub min_factors: usize,
    pub factor_weights: FactorWeights,
    pub strength_bands: StrengthBands,
    pub volume_window: usize,
    pub volume_spike_threshold: f64,
    /// Graded on volume ratio / spike threshold.
    pub volume_reliability: ReliabilityCuts,
    /// Cap on a volume reading's value, in multiples of the threshold.
    pub volume_value_cap: f64,
    pub candle: CandleRules,
    pub reliability_confidence: ReliabilityConfidence,
    pub pattern: PatternRules,
    pub pattern_timeout_bars: usize,
    pub pip_size: f64,
    pub stop_buffer_pips: f64,
    pub spread_pips: f64,
    pub position_risk_percent: f64,
    pub signal_timeout_bars: usize,
    pub touch_policy: TouchPolicy,
    /// Snapshot the state every N processed bars for `seek`.
    pub checkpoint_interval: usize,
    /// Retain at most this many fractals / swings / patterns / outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            extremum_half_window: 2,
            swing_lookback_bars: 500,
            retracement_ratios: vec![0.236, 0.382, 0.5, 0.618, 0.786],
            extension_ratios: vec![1.0, 1.272, 1.618, 2.618],
            fib_tolerance: 0.001,
            confluence_distance: 0.001,
            min_factors: 2,
            factor_weights: FactorWeights::default(),
            strength_bands: StrengthBands::default(),
            volume_window: 20,
            volume_spike_threshold: 1.5,
            volume_reliability: ReliabilityCuts {
                moderate: 1.5,
                strong: 2.0,
            },
            volume_value_cap: 2.0,
            candle: CandleRules::default(),
            reliability_confidence: ReliabilityConfidence::default(),
            pattern: PatternRules::default(),
            pattern_timeout_bars: 20,
            pip_size: 0.0001,
            stop_buffer_pips: 2.0,
            spread_pips: 1.0,
            position_risk_percent: 1.0,
            signal_timeout_bars: 50,
            touch_policy: TouchPolicy::HighLow,
            checkpoint_interval: 256,
            history_limit: None,
        }
    }
}

impl StrategyConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string. Omitted keys take defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize config: {e}"))
    }

    /// Reject configurations the algorithms cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extremum_half_window == 0 {
            return Err(invalid("extremum_half_window", "must be >= 1"));
        }
        if self.swing_lookback_bars == 0 {
            return Err(invalid("swing_lookback_bars", "must be >= 1"));
        }
        check_ratios("retracement_ratios", &self.retracement_ratios)?;
        check_ratios("extension_ratios", &self.extension_ratios)?;
        check_positive("fib_tolerance", self.fib_tolerance)?;
        check_positive("confluence_distance", self.confluence_distance)?;
        if self.min_factors == 0 {
            return Err(invalid("min_factors", "must be >= 1"));
        }
        for (factor_type, weight) in self.factor_weights.iter() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(invalid(
                    "factor_weights",
                    format!("weight for {} must be finite and >= 0, got {weight}", factor_type.as_str()),
                ));
            }
        }

        let bands = &self.strength_bands;
        if !(bands.moderate_min.is_finite() && bands.strong_min.is_finite())
            || bands.moderate_min < 0.0
            || bands.moderate_min > bands.strong_min
        {
            return Err(invalid(
                "strength_bands",
                "must satisfy 0 <= moderate_min <= strong_min",
            ));
        }

        if self.volume_window == 0 {
            return Err(invalid("volume_window", "must be >= 1"));
        }
        check_positive("volume_spike_threshold", self.volume_spike_threshold)?;
        self.volume_reliability.check("volume_reliability")?;
        check_positive("volume_value_cap", self.volume_value_cap)?;

        let c = &self.candle;
        check_positive("candle.hammer_shadow_ratio", c.hammer_shadow_ratio)?;
        check_fraction("candle.doji_body_ratio", c.doji_body_ratio)?;
        check_fraction("candle.pin_shadow_ratio", c.pin_shadow_ratio)?;
        c.hammer_reliability.check("candle.hammer_reliability")?;
        c.pin_reliability.check("candle.pin_reliability")?;
        if !(c.engulfing_strong_multiple.is_finite() && c.engulfing_strong_multiple >= 1.0) {
            return Err(invalid("candle.engulfing_strong_multiple", "must be finite and >= 1"));
        }

        let rc = &self.reliability_confidence;
        if ![rc.weak, rc.moderate, rc.strong]
            .iter()
            .all(|c| (0.0..=1.0).contains(c))
            || rc.weak > rc.moderate
            || rc.moderate > rc.strong
        {
            return Err(invalid(
                "reliability_confidence",
                "must lie in [0, 1] with weak <= moderate <= strong",
            ));
        }

        let p = &self.pattern;
        if !(p.wave_b_min > 0.0 && p.wave_b_min <= p.wave_b_max) {
            return Err(invalid("pattern.wave_b_min", "must satisfy 0 < wave_b_min <= wave_b_max"));
        }
        if !(p.wave_c_min > 0.0 && p.wave_c_min <= p.wave_c_max) {
            return Err(invalid("pattern.wave_c_min", "must satisfy 0 < wave_c_min <= wave_c_max"));
        }
        if p.ideal_b_low > p.ideal_b_high {
            return Err(invalid("pattern.ideal_b_low", "must be <= ideal_b_high"));
        }
        if !(p.ratio_tolerance.is_finite() && p.ratio_tolerance >= 0.0) {
            return Err(invalid("pattern.ratio_tolerance", "must be finite and >= 0"));
        }
        if p.scan_depth == 0 {
            return Err(invalid("pattern.scan_depth", "must be >= 1"));
        }
        check_non_negative("pattern.complete_score", p.complete_score)?;
        check_non_negative("pattern.ideal_b_score", p.ideal_b_score)?;
        check_non_negative("pattern.near_ideal_b_score", p.near_ideal_b_score)?;
        check_non_negative("pattern.acceptable_b_score", p.acceptable_b_score)?;
        check_non_negative("pattern.fib_confluence_score", p.fib_confluence_score)?;
        for target in &p.wave_c_targets {
            check_positive("pattern.wave_c_targets", target.ratio)?;
            check_non_negative("pattern.wave_c_targets", target.score)?;
        }

        check_positive("pip_size", self.pip_size)?;
        check_non_negative("stop_buffer_pips", self.stop_buffer_pips)?;
        check_non_negative("spread_pips", self.spread_pips)?;
        if !(self.position_risk_percent > 0.0 && self.position_risk_percent <= 100.0) {
            return Err(invalid("position_risk_percent", "must lie in (0, 100]"));
        }
        if self.signal_timeout_bars == 0 {
            return Err(invalid("signal_timeout_bars", "must be >= 1"));
        }
        if self.checkpoint_interval == 0 {
            return Err(invalid("checkpoint_interval", "must be >= 1"));
        }
        if self.history_limit == Some(0) {
            return Err(invalid("history_limit", "must be >= 1 when set"));
        }
        Ok(())
    }

    /// Content hash identifying this exact parameter set (for weight sweeps).
    pub fn fingerprint(&self) -> ConfigHash {
        ConfigHash::of(self)
    }

    /// Stop buffer in price units.
    pub fn stop_buffer(&self) -> f64 {
        self.stop_buffer_pips * self.pip_size
    }

    pub fn spread(&self) -> f64 {
        self.spread_pips * self.pip_size
    }
}

fn check_ratios(field: &'static str, ratios: &[f64]) -> Result<(), ConfigError> {
    if ratios.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if let Some(bad) = ratios.iter().find(|r| !r.is_finite() || **r <= 0.0) {
        return Err(invalid(field, format!("ratios must be finite and > 0, got {bad}")));
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, format!("must be finite and > 0, got {value}")));
    }
    Ok(())
}

fn check_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid(field, format!("must lie in (0, 1], got {value}")));
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(field, format!("must be finite and >= 0, got {value}")));
    }
    Ok(())
}
