//! Domain types: plain structured records with no behaviour beyond
//! derived quantities. Every type serializes with serde.

pub mod bar;
pub mod confluence;
pub mod extremum;
pub mod ids;
pub mod level;
pub mod outcome;
pub mod pattern;
pub mod signal;
pub mod swing;

pub use bar::{Bar, BarError};
pub use confluence::{
    Bias, ConfluenceFactor, ConfluenceZone, FactorType, Reliability, ZoneStrength,
};
pub use extremum::{Extremum, ExtremumKind};
pub use ids::{ExtremumId, IdGen, PatternId, SignalId, SwingId};
pub use level::{FibonacciLevel, LevelKind};
pub use outcome::{OutcomeRecord, OutcomeSummary, Resolution, TierStats};
pub use pattern::{AbcWave, CorrectivePattern, PatternType};
pub use signal::{QualityTier, Signal, SignalDirection};
pub use swing::{Swing, SwingDirection};
