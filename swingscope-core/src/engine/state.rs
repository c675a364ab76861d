//! Per-bar delta and full snapshot types returned by the state machine.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::{
    ConfluenceZone, CorrectivePattern, Extremum, FibonacciLevel, OutcomeRecord, OutcomeSummary,
    Signal, Swing,
};

use super::signal_generator::TradeMode;

/// What changed while processing one bar. Incremental consumers apply these
/// instead of re-reading the full state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateDelta {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    /// Fractal confirmed on this bar (it sits `extremum_half_window` bars back).
    pub extremum: Option<Extremum>,
    /// Swing built from the newly confirmed fractal.
    pub swing: Option<Swing>,
    /// Dominant swings that were replaced, expired or recomputed.
    pub dominant_changes: Vec<Swing>,
    pub reference_changed: bool,
    pub pattern: Option<CorrectivePattern>,
    pub zones: Vec<ConfluenceZone>,
    pub signal: Option<Signal>,
    pub outcome: Option<OutcomeRecord>,
    /// The reference swing was broken by this bar's close.
    pub setup_invalidated: bool,
}

impl StateDelta {
    pub(crate) fn new(bar_index: usize, timestamp: NaiveDateTime) -> Self {
        Self {
            bar_index,
            timestamp,
            extremum: None,
            swing: None,
            dominant_changes: Vec::new(),
            reference_changed: false,
            pattern: None,
            zones: Vec::new(),
            signal: None,
            outcome: None,
            setup_invalidated: false,
        }
    }
}

/// Complete reconstructed state after the last processed bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullState {
    /// Bars processed so far; the last processed index is `bars_processed - 1`.
    pub bars_processed: usize,
    pub mode: TradeMode,
    /// The alternating chain of confirmed extrema, oldest first.
    pub extrema: Vec<Extremum>,
    pub swings: Vec<Swing>,
    pub dominant_up: Option<Swing>,
    pub dominant_down: Option<Swing>,
    pub reference: Option<Swing>,
    pub levels: Vec<FibonacciLevel>,
    pub active_pattern: Option<CorrectivePattern>,
    pub patterns: Vec<CorrectivePattern>,
    pub zones: Vec<ConfluenceZone>,
    pub signals: Vec<Signal>,
    pub open_signal: Option<Signal>,
    pub outcomes: Vec<OutcomeRecord>,
    pub summary: OutcomeSummary,
}

impl FullState {
    pub fn last_index(&self) -> Option<usize> {
        self.bars_processed.checked_sub(1)
    }
}
