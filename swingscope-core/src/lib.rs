//! SwingScope Core: incremental market-structure analysis for one instrument
//! on one timeframe.
//!
//! This crate contains:
//! - Domain types (bars, extrema, swings, levels, patterns, zones, signals, outcomes)
//! - Fractal extremum detection and alternating swing tracking
//! - Fibonacci retracement/extension levels of the reference swing
//! - A-B-C corrective pattern detection
//! - Pluggable confluence factor detectors clustered into zones
//! - Signal generation and outcome tracking
//! - A replayable state machine with checkpointed seek
//!
//! Everything is deterministic: the same config and bars always yield the
//! same state, ids included.

pub mod components;
pub mod config;
pub mod domain;
pub mod engine;
pub mod fingerprint;

pub use config::{ConfigError, StrategyConfig};
pub use engine::{EngineError, FullState, StateDelta, StrategyStateMachine, TradeMode};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the machine and everything it hands out can move
    /// to a worker thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Extremum>();
        require_sync::<domain::Extremum>();
        require_send::<domain::Swing>();
        require_sync::<domain::Swing>();
        require_send::<domain::FibonacciLevel>();
        require_sync::<domain::FibonacciLevel>();
        require_send::<domain::CorrectivePattern>();
        require_sync::<domain::CorrectivePattern>();
        require_send::<domain::ConfluenceZone>();
        require_sync::<domain::ConfluenceZone>();
        require_send::<domain::Signal>();
        require_sync::<domain::Signal>();
        require_send::<domain::OutcomeRecord>();
        require_sync::<domain::OutcomeRecord>();
        require_send::<domain::OutcomeSummary>();
        require_sync::<domain::OutcomeSummary>();

        // Config and fingerprints
        require_send::<StrategyConfig>();
        require_sync::<StrategyConfig>();
        require_send::<fingerprint::RunFingerprint>();
        require_sync::<fingerprint::RunFingerprint>();

        // Detectors
        require_send::<components::ConfluenceEngine>();
        require_sync::<components::ConfluenceEngine>();
        require_send::<components::SwingTracker>();
        require_sync::<components::SwingTracker>();

        // Engine types
        require_send::<StrategyStateMachine>();
        require_sync::<StrategyStateMachine>();
        require_send::<FullState>();
        require_sync::<FullState>();
        require_send::<StateDelta>();
        require_sync::<StateDelta>();
        require_send::<EngineError>();
        require_sync::<EngineError>();
    }

    /// Factor detectors see bars and structure only, never the trade state.
    #[test]
    fn factor_detector_has_no_trade_state_parameter() {
        fn _check_trait_object_builds(
            detector: &dyn components::FactorDetector,
            ctx: &components::FactorContext<'_>,
        ) -> Vec<domain::ConfluenceFactor> {
            detector.evaluate(ctx)
        }
    }
}
