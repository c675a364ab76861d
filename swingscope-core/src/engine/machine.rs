//! The incremental bar-processing state machine.
//!
//! Each bar runs the same fixed sequence against the accumulated state:
//!
//! 1. Fractal confirmation for the bar `w` back, fed to the swing tracker
//! 2. Lookback expiry, dominant and reference swing refresh, levels
//! 3. A-B-C detection when the extremum chain changed; pattern staleness
//! 4. Managing mode: outcome check, then setup invalidation at the close
//! 5. Confluence factors and zones
//! 6. Finding mode: signal search
//!
//! Everything the sequence mutates lives in one `Clone` value. Checkpoints of
//! it are taken every `checkpoint_interval` bars, and `seek` restores the
//! nearest one and replays the stored bars, so any index is reproducible.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::components::{
    ChainEvent, ConfluenceEngine, CorrectivePatternDetector, ExtremumDetector, LevelCalculator,
    SwingTracker,
};
use crate::config::{ConfigError, StrategyConfig};
use crate::domain::{
    Bar, BarError, ConfluenceZone, CorrectivePattern, Extremum, FibonacciLevel, IdGen,
    OutcomeSummary, Signal, Swing, SwingDirection, SwingId,
};
use crate::fingerprint::RunFingerprint;

use super::arena::Arena;
use super::outcome::OutcomeTracker;
use super::signal_generator::{setup_invalidated, SetupContext, SignalGenerator, TradeMode};
use super::state::{FullState, StateDelta};

/// Hard failures surfaced to the driver. Non-detections are never errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("malformed bar at index {index} ({timestamp}): {source}")]
    MalformedBar {
        index: usize,
        timestamp: NaiveDateTime,
        source: BarError,
    },

    #[error("bar at index {index} ({timestamp}) is not after the previous bar ({previous})")]
    OutOfOrder {
        index: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },

    #[error("seek to index {index} out of range: {len} bars stored")]
    SeekOutOfRange { index: usize, len: usize },
}

/// Everything that evolves bar by bar.
#[derive(Debug, Clone, PartialEq)]
struct Core {
    bars_processed: usize,
    ids: IdGen,
    tracker: SwingTracker,
    extrema: Arena<Extremum>,
    swings: Arena<Swing>,
    patterns: Arena<CorrectivePattern>,
    signals: Arena<Signal>,
    outcomes: OutcomeTracker,
    mode: TradeMode,
    open_signal: Option<Signal>,
    /// Swing the open signal was measured on.
    open_setup: Option<Swing>,
    levels: Vec<FibonacciLevel>,
    active_pattern: Option<CorrectivePattern>,
    zones: Vec<ConfluenceZone>,
    /// Reference swing whose origin has been broken; no setups on it.
    invalidated_swing: Option<SwingId>,
}

impl Core {
    fn new(config: &StrategyConfig) -> Self {
        let limit = config.history_limit;
        Self {
            bars_processed: 0,
            ids: IdGen::default(),
            tracker: SwingTracker::new(config.swing_lookback_bars),
            extrema: Arena::new(limit),
            swings: Arena::new(limit),
            patterns: Arena::new(limit),
            signals: Arena::new(limit),
            outcomes: OutcomeTracker::new(config.signal_timeout_bars, config.touch_policy, limit),
            mode: TradeMode::Finding,
            open_signal: None,
            open_setup: None,
            levels: Vec::new(),
            active_pattern: None,
            zones: Vec::new(),
            invalidated_swing: None,
        }
    }

    fn close_signal(&mut self) {
        self.mode = TradeMode::Finding;
        self.open_signal = None;
        self.open_setup = None;
    }
}

/// Stateless per-bar logic, built once from the config.
#[derive(Debug)]
struct Pipeline {
    extremum: ExtremumDetector,
    levels: LevelCalculator,
    patterns: CorrectivePatternDetector,
    confluence: ConfluenceEngine,
    generator: SignalGenerator,
    pattern_timeout_bars: usize,
    /// Chain entries kept for pattern scanning.
    chain_keep: usize,
}

impl Pipeline {
    fn new(config: &StrategyConfig) -> Self {
        Self {
            extremum: ExtremumDetector::new(config.extremum_half_window),
            levels: LevelCalculator::new(
                config.retracement_ratios.clone(),
                config.extension_ratios.clone(),
            ),
            patterns: CorrectivePatternDetector::new(config.pattern.clone(), config.fib_tolerance),
            confluence: ConfluenceEngine::from_config(config),
            generator: SignalGenerator::from_config(config),
            pattern_timeout_bars: config.pattern_timeout_bars,
            chain_keep: (config.pattern.scan_depth + 3).max(4),
        }
    }

    /// Process the last bar of `bars`, which must be bar `core.bars_processed`.
    fn step(&self, core: &mut Core, bars: &[Bar]) -> StateDelta {
        let index = core.bars_processed;
        let bar = &bars[index];
        let mut delta = StateDelta::new(index, bar.timestamp);
        let mut changed: Vec<SwingDirection> = Vec::new();
        let mut chain_changed = false;

        // -- 1. Fractal confirmation --
        if let Some(candidate) = self.extremum.candidate_for(index) {
            if let Some(mut extremum) = self.extremum.detect(bars, candidate) {
                extremum.id = core.ids.extremum();
                tracing::debug!(
                    extremum = %extremum.id,
                    index = extremum.index,
                    kind = ?extremum.kind,
                    price = extremum.price,
                    "extremum confirmed"
                );
                let update = core.tracker.on_new_extremum(extremum.clone(), &mut core.ids);
                match update.chain {
                    ChainEvent::Ignored => {}
                    ChainEvent::Appended => core.extrema.push(extremum.clone()),
                    ChainEvent::Superseded(old) => {
                        if !core.extrema.revise_last(|x| x.id == old, extremum.clone()) {
                            core.extrema.push(extremum.clone());
                        }
                        core.swings.retract_last(|s| s.end.id == old);
                    }
                }
                if update.accepted() {
                    chain_changed = true;
                    if let Some(swing) = &update.swing {
                        core.swings.push(swing.clone());
                    }
                    changed.extend(update.dominant_changed);
                    delta.extremum = Some(extremum);
                    delta.swing = update.swing;
                    core.tracker.trim_chain(self.chain_keep);
                }
            }
        }

        // -- 2. Dominant and reference swings --
        changed.extend(core.tracker.expire(index));
        delta.reference_changed = core.tracker.refresh_reference();
        changed.sort_by_key(|d| matches!(d, SwingDirection::Down));
        changed.dedup();
        for direction in changed {
            if let Some(swing) = core.tracker.dominant(direction) {
                tracing::debug!(
                    swing = %swing.id,
                    direction = ?direction,
                    magnitude = swing.magnitude,
                    "dominant swing changed"
                );
                delta.dominant_changes.push(swing.clone());
            }
        }
        core.levels = core
            .tracker
            .reference()
            .map(|r| self.levels.levels(r))
            .unwrap_or_default();
        if delta.reference_changed && core.active_pattern.take().is_some() {
            tracing::debug!(bar_index = index, "pattern cleared: reference direction changed");
        }

        // -- 3. Corrective pattern --
        if chain_changed {
            if let Some(reference) = core.tracker.reference() {
                if let Some(mut pattern) =
                    self.patterns
                        .detect(core.tracker.chain(), reference, &core.levels)
                {
                    // The same window is re-selected until the chain moves on.
                    let is_new = core
                        .patterns
                        .last()
                        .map_or(true, |last| last.extrema != pattern.extrema);
                    if is_new {
                        pattern.id = core.ids.pattern();
                        core.patterns.push(pattern.clone());
                        core.active_pattern = Some(pattern.clone());
                        delta.pattern = Some(pattern);
                    }
                }
            }
        }
        if core
            .active_pattern
            .as_ref()
            .is_some_and(|p| index > p.completion_index() + self.pattern_timeout_bars)
        {
            core.active_pattern = None;
        }

        // -- 4. Managing: exits, then invalidation at the close --
        let mut resolved_this_bar = false;
        if let TradeMode::Managing { signal_id } = core.mode {
            if let Some(record) = core.outcomes.update(signal_id, bar, index) {
                delta.outcome = Some(record);
                core.close_signal();
                resolved_this_bar = true;
            } else if let Some(setup) = core
                .open_setup
                .clone()
                .filter(|s| setup_invalidated(s, bar.close))
            {
                tracing::warn!(
                    signal = %signal_id,
                    swing = %setup.id,
                    close = bar.close,
                    "setup invalidated while managing signal"
                );
                delta.outcome = core.outcomes.resolve_invalidated(signal_id, index);
                delta.setup_invalidated = true;
                core.invalidated_swing = Some(setup.id);
                core.active_pattern = None;
                core.close_signal();
                resolved_this_bar = true;
            }
        }
        if let Some(reference) = core.tracker.reference() {
            if core.invalidated_swing != Some(reference.id) && setup_invalidated(reference, bar.close) {
                tracing::debug!(
                    swing = %reference.id,
                    close = bar.close,
                    "setup invalidated"
                );
                core.invalidated_swing = Some(reference.id);
                core.active_pattern = None;
                delta.setup_invalidated = true;
            }
        }

        // -- 5. Confluence --
        let factors = self.confluence.evaluate(
            bars,
            index,
            &core.levels,
            core.tracker.reference(),
            core.active_pattern.as_ref(),
        );
        core.zones = self.confluence.zones(&factors);
        delta.zones = core.zones.clone();

        // -- 6. Signal search --
        if core.mode == TradeMode::Finding && !resolved_this_bar {
            if let Some(reference) = core.tracker.reference() {
                if core.invalidated_swing != Some(reference.id) {
                    let ctx = SetupContext {
                        bar,
                        bar_index: index,
                        reference,
                        levels: &core.levels,
                        zones: &core.zones,
                        pattern: core.active_pattern.as_ref(),
                    };
                    if let Some(signal) = self.generator.on_bar(core.mode, &ctx, &mut core.ids) {
                        core.outcomes.register(signal.clone());
                        core.signals.push(signal.clone());
                        core.mode = TradeMode::Managing {
                            signal_id: signal.id,
                        };
                        core.open_signal = Some(signal.clone());
                        core.open_setup = Some(reference.clone());
                        delta.signal = Some(signal);
                    }
                }
            }
        }

        core.bars_processed += 1;
        delta
    }
}

/// Deterministic, replayable market-structure engine for one instrument and
/// timeframe.
///
/// The machine stores every accepted bar. `process_bar` appends (dropping any
/// stored bars beyond the current position first), `step_forward` replays the
/// next stored bar, and `seek` jumps to any stored index.
#[derive(Debug)]
pub struct StrategyStateMachine {
    config: StrategyConfig,
    pipeline: Pipeline,
    tape: Vec<Bar>,
    core: Core,
    /// `checkpoints[k]` is the state after `k * checkpoint_interval` bars.
    checkpoints: Vec<Core>,
}

impl StrategyStateMachine {
    /// Validate `config` and build an empty machine.
    pub fn new(config: StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let core = Core::new(&config);
        let pipeline = Pipeline::new(&config);
        tracing::debug!(
            config = %config.fingerprint(),
            detectors = ?pipeline.confluence.detector_names(),
            "state machine created"
        );
        Ok(Self {
            pipeline,
            tape: Vec::new(),
            checkpoints: vec![core.clone()],
            core,
            config,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Bars processed so far (the cursor).
    pub fn position(&self) -> usize {
        self.core.bars_processed
    }

    /// Bars stored, including any beyond the cursor after a backward seek.
    pub fn len(&self) -> usize {
        self.tape.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tape.is_empty()
    }

    /// Bars up to the cursor.
    pub fn bars(&self) -> &[Bar] {
        &self.tape[..self.core.bars_processed]
    }

    pub fn mode(&self) -> TradeMode {
        self.core.mode
    }

    /// Validate and process one new bar.
    ///
    /// Malformed or out-of-order bars are rejected before touching any state.
    pub fn process_bar(&mut self, bar: Bar) -> Result<StateDelta, EngineError> {
        let index = self.core.bars_processed;
        if let Err(source) = bar.validate() {
            tracing::warn!(index, timestamp = %bar.timestamp, error = %source, "bar rejected");
            return Err(EngineError::MalformedBar {
                index,
                timestamp: bar.timestamp,
                source,
            });
        }
        if let Some(previous) = index.checked_sub(1).map(|i| self.tape[i].timestamp) {
            if bar.timestamp <= previous {
                tracing::warn!(index, timestamp = %bar.timestamp, %previous, "bar out of order");
                return Err(EngineError::OutOfOrder {
                    index,
                    timestamp: bar.timestamp,
                    previous,
                });
            }
        }

        if self.tape.len() > index {
            self.tape.truncate(index);
            self.checkpoints
                .truncate(index / self.config.checkpoint_interval + 1);
        }
        self.tape.push(bar);
        Ok(self.advance())
    }

    /// Process a whole series, stopping at the first rejected bar.
    pub fn process_all(
        &mut self,
        bars: impl IntoIterator<Item = Bar>,
    ) -> Result<Vec<StateDelta>, EngineError> {
        bars.into_iter().map(|bar| self.process_bar(bar)).collect()
    }

    /// Replay the next stored bar, if any.
    pub fn step_forward(&mut self) -> Option<StateDelta> {
        (self.core.bars_processed < self.tape.len()).then(|| self.advance())
    }

    /// Reconstruct the state right after bar `index` was processed.
    pub fn seek(&mut self, index: usize) -> Result<FullState, EngineError> {
        if index >= self.tape.len() {
            return Err(EngineError::SeekOutOfRange {
                index,
                len: self.tape.len(),
            });
        }
        let target = index + 1;
        let interval = self.config.checkpoint_interval;
        let slot = (target / interval).min(self.checkpoints.len() - 1);
        let resume_here =
            self.core.bars_processed <= target && self.core.bars_processed >= slot * interval;
        if !resume_here {
            self.core = self.checkpoints[slot].clone();
        }
        tracing::debug!(
            index,
            from = self.core.bars_processed,
            "seek replaying stored bars"
        );
        while self.core.bars_processed < target {
            self.advance();
        }
        Ok(self.snapshot())
    }

    /// Back to the empty state, keeping the stored bars for replay.
    pub fn rewind(&mut self) {
        self.core = self.checkpoints[0].clone();
    }

    fn advance(&mut self) -> StateDelta {
        let end = self.core.bars_processed;
        let delta = self.pipeline.step(&mut self.core, &self.tape[..=end]);

        let processed = self.core.bars_processed;
        let interval = self.config.checkpoint_interval;
        if processed % interval == 0 && processed / interval == self.checkpoints.len() {
            self.checkpoints.push(self.core.clone());
        }
        delta
    }

    /// The complete current state.
    pub fn snapshot(&self) -> FullState {
        let core = &self.core;
        FullState {
            bars_processed: core.bars_processed,
            mode: core.mode,
            extrema: core.extrema.to_vec(),
            swings: core.swings.to_vec(),
            dominant_up: core.tracker.dominant(SwingDirection::Up).cloned(),
            dominant_down: core.tracker.dominant(SwingDirection::Down).cloned(),
            reference: core.tracker.reference().cloned(),
            levels: core.levels.clone(),
            active_pattern: core.active_pattern.clone(),
            patterns: core.patterns.to_vec(),
            zones: core.zones.clone(),
            signals: core.signals.to_vec(),
            open_signal: core.open_signal.clone(),
            outcomes: core.outcomes.resolved().to_vec(),
            summary: core.outcomes.summary(),
        }
    }

    pub fn summary(&self) -> OutcomeSummary {
        self.core.outcomes.summary()
    }

    /// Identity of the config plus the bars processed so far.
    pub fn fingerprint(&self) -> RunFingerprint {
        RunFingerprint::new(&self.config, self.bars())
    }

    /// Number of stored checkpoints, the empty state included.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }
}
