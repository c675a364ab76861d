//! Outcome tracking: the lifecycle OPEN -> {TARGET_HIT, STOP_HIT, TIMEOUT,
//! SETUP_INVALIDATED} of every emitted signal.
//!
//! A bar that touches both stop and target resolves as STOP_HIT: without
//! intrabar data the adverse path is assumed.

use std::collections::BTreeMap;

use crate::config::TouchPolicy;
use crate::domain::{
    Bar, OutcomeRecord, OutcomeSummary, QualityTier, Resolution, Signal, SignalDirection,
    SignalId, TierStats,
};

use super::arena::Arena;

#[derive(Debug, Clone, PartialEq)]
struct OpenSignal {
    signal: Signal,
    mfe: f64,
    mae: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeTracker {
    timeout_bars: usize,
    touch_policy: TouchPolicy,
    open: BTreeMap<SignalId, OpenSignal>,
    resolved: Arena<OutcomeRecord>,
}

impl OutcomeTracker {
    pub fn new(timeout_bars: usize, touch_policy: TouchPolicy, history_limit: Option<usize>) -> Self {
        Self {
            timeout_bars,
            touch_policy,
            open: BTreeMap::new(),
            resolved: Arena::new(history_limit),
        }
    }

    pub fn register(&mut self, signal: Signal) {
        self.open.insert(
            signal.id,
            OpenSignal {
                signal,
                mfe: 0.0,
                mae: 0.0,
            },
        );
    }

    pub fn is_open(&self, signal_id: SignalId) -> bool {
        self.open.contains_key(&signal_id)
    }

    /// Check `bar` (at `bar_index`) against the signal's stop and target.
    ///
    /// Bars at or before the signal bar are ignored. Returns the record when
    /// the signal resolves; the signal is then closed for good.
    pub fn update(&mut self, signal_id: SignalId, bar: &Bar, bar_index: usize) -> Option<OutcomeRecord> {
        let policy = self.touch_policy;
        let timeout_bars = self.timeout_bars;
        let entry = self.open.get_mut(&signal_id)?;
        if bar_index <= entry.signal.bar_index {
            return None;
        }
        let elapsed = bar_index - entry.signal.bar_index;

        let (low, high) = match policy {
            TouchPolicy::HighLow => (bar.low, bar.high),
            TouchPolicy::Close => (bar.close, bar.close),
        };
        let signal = &entry.signal;
        let (favorable, adverse, stop_touched, target_touched) = match signal.direction {
            SignalDirection::Long => (
                high - signal.entry_price,
                signal.entry_price - low,
                low <= signal.stop_price,
                high >= signal.target_price,
            ),
            SignalDirection::Short => (
                signal.entry_price - low,
                high - signal.entry_price,
                high >= signal.stop_price,
                low <= signal.target_price,
            ),
        };
        entry.mfe = entry.mfe.max(favorable);
        entry.mae = entry.mae.max(adverse);

        let resolution = if stop_touched {
            Resolution::StopHit
        } else if target_touched {
            Resolution::TargetHit
        } else if elapsed >= timeout_bars {
            Resolution::Timeout
        } else {
            return None;
        };
        self.close(signal_id, resolution, bar_index)
    }

    /// Close an open signal because its swing was broken.
    pub fn resolve_invalidated(&mut self, signal_id: SignalId, bar_index: usize) -> Option<OutcomeRecord> {
        self.close(signal_id, Resolution::SetupInvalidated, bar_index)
    }

    fn close(&mut self, signal_id: SignalId, resolution: Resolution, bar_index: usize) -> Option<OutcomeRecord> {
        let entry = self.open.remove(&signal_id)?;
        let record = OutcomeRecord {
            signal_id,
            resolution,
            quality_tier: entry.signal.quality_tier,
            resolved_bar: bar_index,
            bars_to_resolution: bar_index.saturating_sub(entry.signal.bar_index),
            max_favorable_excursion: entry.mfe,
            max_adverse_excursion: entry.mae,
        };
        tracing::info!(
            signal = %signal_id,
            resolution = ?resolution,
            bars = record.bars_to_resolution,
            mfe = record.max_favorable_excursion,
            mae = record.max_adverse_excursion,
            "signal resolved"
        );
        self.resolved.push(record.clone());
        Some(record)
    }

    /// Resolved records still retained, oldest first.
    pub fn resolved(&self) -> &Arena<OutcomeRecord> {
        &self.resolved
    }

    /// Aggregate statistics over the retained resolved records.
    ///
    /// Win rate counts target hits among stop hits, target hits and timeouts;
    /// invalidated setups never entered a decision and are excluded.
    pub fn summary(&self) -> OutcomeSummary {
        let records: Vec<&OutcomeRecord> = self.resolved.iter().collect();
        let count = |r: Resolution| records.iter().filter(|o| o.resolution == r).count();

        let mut summary = OutcomeSummary {
            total: records.len(),
            target_hits: count(Resolution::TargetHit),
            stop_hits: count(Resolution::StopHit),
            timeouts: count(Resolution::Timeout),
            invalidated: count(Resolution::SetupInvalidated),
            ..OutcomeSummary::default()
        };
        if records.is_empty() {
            return summary;
        }

        let decided = summary.target_hits + summary.stop_hits + summary.timeouts;
        summary.win_rate = ratio(summary.target_hits, decided);

        let n = records.len() as f64;
        summary.avg_bars_to_resolution =
            records.iter().map(|r| r.bars_to_resolution as f64).sum::<f64>() / n;
        summary.avg_mfe = records.iter().map(|r| r.max_favorable_excursion).sum::<f64>() / n;
        summary.avg_mae = records.iter().map(|r| r.max_adverse_excursion).sum::<f64>() / n;

        let mut by_tier: BTreeMap<QualityTier, TierStats> = BTreeMap::new();
        for record in records
            .iter()
            .filter(|r| r.resolution != Resolution::SetupInvalidated)
        {
            let stats = by_tier.entry(record.quality_tier).or_default();
            stats.resolved += 1;
            if record.resolution == Resolution::TargetHit {
                stats.target_hits += 1;
            }
        }
        for stats in by_tier.values_mut() {
            stats.win_rate = ratio(stats.target_hits, stats.resolved);
        }
        summary.by_tier = by_tier;
        summary
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
