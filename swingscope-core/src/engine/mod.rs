//! Bar-by-bar engine and supporting state.
//!
//! `StrategyStateMachine` owns everything: the stored bars, the evolving
//! market structure, the trade lifecycle and the outcome statistics. Callers
//! feed bars in timestamp order and read back a `StateDelta` per bar, or a
//! `FullState` snapshot at any stored index via `seek`.

pub mod arena;
pub mod machine;
pub mod outcome;
pub mod signal_generator;
pub mod state;

pub use arena::Arena;
pub use machine::{EngineError, StrategyStateMachine};
pub use outcome::OutcomeTracker;
pub use signal_generator::{setup_invalidated, SetupContext, SignalGenerator, TradeMode};
pub use state::{FullState, StateDelta};
