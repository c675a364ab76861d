//! Detectors, one per stage of the pipeline:
//! - Extremum detection: windowed fractal check, one per bar
//! - Swing tracking: alternating chain, dominant swing per direction
//! - Levels: retracement/extension prices of a swing
//! - Corrective patterns: single best A-B-C window
//! - Factors and confluence: independent detectors clustered into zones
//!
//! Every detector is a pure function of its inputs plus its own small state.
//! None of them perform I/O or keep references to the bar tape.

pub mod confluence;
pub mod corrective;
pub mod extremum;
pub mod factor;
pub mod levels;
pub mod swing;

pub use confluence::{cluster, ConfluenceEngine};
pub use corrective::CorrectivePatternDetector;
pub use extremum::ExtremumDetector;
pub use factor::{FactorContext, FactorDetector};
pub use levels::{levels_for, range_touches, touched_retracement, LevelCalculator};
pub use swing::{ChainEvent, SwingTracker, SwingUpdate};
