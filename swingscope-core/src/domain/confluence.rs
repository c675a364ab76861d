//! Confluence factors and the zones they cluster into.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Closed set of independent factor detectors. Used as the key of the
/// configurable weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorType {
    FibonacciLevel,
    VolumeSpike,
    Hammer,
    Engulfing,
    Doji,
    PinBar,
    PatternCompletion,
}

impl FactorType {
    pub const ALL: [FactorType; 7] = [
        FactorType::FibonacciLevel,
        FactorType::VolumeSpike,
        FactorType::Hammer,
        FactorType::Engulfing,
        FactorType::Doji,
        FactorType::PinBar,
        FactorType::PatternCompletion,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

/// Reliability band of a candle or factor reading. The confidence each band
/// maps to is configured by `ReliabilityConfidence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    Weak,
    Moderate,
    Strong,
}

/// One factor reading at a price/time point. Ephemeral per bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceFactor {
    pub factor_type: FactorType,
    pub value: f64,
    pub weight: f64,
    /// In [0, 1].
    pub confidence: f64,
    pub price_level: f64,
    pub timestamp: NaiveDateTime,
    pub bias: Bias,
}

impl ConfluenceFactor {
    pub fn weighted_value(&self) -> f64 {
        self.value * self.weight * self.confidence
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStrength {
    Weak,
    Moderate,
    Strong,
}

/// A price cluster of at least `min_factors` factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceZone {
    pub price_level: f64,
    pub factor_count: usize,
    /// sum of value
    pub total_score: f64,
    /// sum of value * weight * confidence
    pub weighted_score: f64,
    pub strength: ZoneStrength,
    pub direction: Bias,
    pub factors: Vec<ConfluenceFactor>,
}

impl ConfluenceZone {
    pub fn mean_confidence(&self) -> f64 {
        if self.factors.is_empty() {
            return 0.0;
        }
        self.factors.iter().map(|f| f.confidence).sum::<f64>() / self.factors.len() as f64
    }

    pub fn contains_factor(&self, factor_type: FactorType) -> bool {
        self.factors.iter().any(|f| f.factor_type == factor_type)
    }

    /// True if anything other than level proximity took part. Two nearby
    /// retracement levels can form a zone on their own.
    pub fn has_confirming_factor(&self) -> bool {
        self.factors
            .iter()
            .any(|f| f.factor_type != FactorType::FibonacciLevel)
    }
}
