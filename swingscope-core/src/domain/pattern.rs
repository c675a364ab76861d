//! Three-wave corrective (A-B-C) structures.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::extremum::Extremum;
use super::ids::{ExtremumId, PatternId};
use super::swing::SwingDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Zigzag,
    Flat,
    Triangle,
}

/// One leg of a corrective pattern, between two confirmed extrema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbcWave {
    pub start_timestamp: NaiveDateTime,
    pub end_timestamp: NaiveDateTime,
    pub start_price: f64,
    pub end_price: f64,
    pub start_index: usize,
    pub end_index: usize,
    pub direction: SwingDirection,
    pub magnitude: f64,
    pub bar_count: usize,
}

impl AbcWave {
    pub fn between(start: &Extremum, end: &Extremum) -> Self {
        let direction = if end.price >= start.price {
            SwingDirection::Up
        } else {
            SwingDirection::Down
        };
        Self {
            start_timestamp: start.timestamp,
            end_timestamp: end.timestamp,
            start_price: start.price,
            end_price: end.price,
            start_index: start.index,
            end_index: end.index,
            direction,
            magnitude: (end.price - start.price).abs(),
            bar_count: end.index.saturating_sub(start.index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectivePattern {
    pub id: PatternId,
    pub wave_a: AbcWave,
    pub wave_b: AbcWave,
    pub wave_c: AbcWave,
    pub pattern_type: PatternType,
    /// Wave C ends at a confirmed extremum. Reported patterns are always complete.
    pub is_complete: bool,
    /// Quality in [0, 1].
    pub quality_score: f64,
    /// Retracement ratio of the reference swing that Wave C terminated on, if any.
    pub fibonacci_confluence: Option<f64>,
    /// |B| / |A|
    pub wave_b_ratio: f64,
    /// |C| / |A|
    pub wave_c_ratio: f64,
    /// The four extrema the waves were built from, oldest first.
    pub extrema: [ExtremumId; 4],
}

impl CorrectivePattern {
    /// Direction price is expected to resume once the correction completes:
    /// opposite to Wave A.
    pub fn resumption_direction(&self) -> SwingDirection {
        self.wave_a.direction.opposite()
    }

    pub fn completion_price(&self) -> f64 {
        self.wave_c.end_price
    }

    pub fn completion_index(&self) -> usize {
        self.wave_c.end_index
    }
}
