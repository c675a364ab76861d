use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ids::SignalId;
use super::signal::QualityTier;

/// How an open signal was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    TargetHit,
    StopHit,
    Timeout,
    /// The reference swing was broken while the signal was open.
    SetupInvalidated,
}

/// Immutable history of one resolved signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub signal_id: SignalId,
    pub resolution: Resolution,
    pub quality_tier: QualityTier,
    pub resolved_bar: usize,
    pub bars_to_resolution: usize,
    /// Best unrealized move in the trade's favour, in price units.
    pub max_favorable_excursion: f64,
    /// Worst unrealized move against the trade, in price units.
    pub max_adverse_excursion: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierStats {
    pub resolved: usize,
    pub target_hits: usize,
    pub win_rate: f64,
}

/// Aggregate statistics over resolved outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub total: usize,
    pub target_hits: usize,
    pub stop_hits: usize,
    pub timeouts: usize,
    pub invalidated: usize,
    /// target_hits / (target_hits + stop_hits + timeouts).
    pub win_rate: f64,
    pub avg_bars_to_resolution: f64,
    pub avg_mfe: f64,
    pub avg_mae: f64,
    pub by_tier: BTreeMap<QualityTier, TierStats>,
}
