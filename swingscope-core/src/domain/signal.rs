//! Signal: a qualified directional trade candidate with defined stop/targets.
//!
//! Signals are immutable once emitted: they describe the market event, not what
//! happened afterwards. Resolution lives in `OutcomeRecord`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::ids::{SignalId, SwingId};
use super::swing::SwingDirection;

/// Directional intent of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDirection {
    Long,
    Short,
}

impl SignalDirection {
    /// Trade direction that follows a reference swing's trend.
    pub fn with_trend(direction: SwingDirection) -> Self {
        match direction {
            SwingDirection::Up => Self::Long,
            SwingDirection::Down => Self::Short,
        }
    }

    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub direction: SignalDirection,
    pub entry_price: f64,
    /// Ratio of the retracement level that was touched.
    pub fibonacci_level: f64,
    /// In [0, 1].
    pub confidence: f64,
    pub stop_price: f64,
    /// Nearest extension target beyond entry.
    pub target_price: f64,
    /// Every extension target beyond entry, nearest first.
    pub target_prices: Vec<f64>,
    pub quality_tier: QualityTier,
    /// Reference swing the setup was measured on.
    pub swing_id: SwingId,
    pub risk_percent: f64,
}

impl Signal {
    /// Price distance between entry and stop.
    pub fn risk_per_unit(&self) -> f64 {
        (self.entry_price - self.stop_price).abs()
    }

    pub fn reward_to_risk(&self) -> f64 {
        let risk = self.risk_per_unit();
        if risk <= 0.0 {
            return 0.0;
        }
        (self.target_price - self.entry_price).abs() / risk
    }

    /// Units to trade so that a stop-out loses `risk_percent` of `equity`.
    pub fn units_for_equity(&self, equity: f64) -> f64 {
        let risk = self.risk_per_unit();
        if risk <= 0.0 || equity <= 0.0 {
            return 0.0;
        }
        equity * self.risk_percent / 100.0 / risk
    }
}
