//! Swing: a directional move between two opposite-kind extrema.

use serde::{Deserialize, Serialize};

use super::extremum::{Extremum, ExtremumKind};
use super::ids::SwingId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingDirection {
    Up,
    Down,
}

impl SwingDirection {
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swing {
    pub id: SwingId,
    pub start: Extremum,
    pub end: Extremum,
    pub direction: SwingDirection,
    /// |end.price - start.price| in price units.
    pub magnitude: f64,
    pub bar_count: usize,
}

impl Swing {
    /// Build a swing between two confirmed extrema of opposite kind.
    ///
    /// Returns `None` if the kinds match or `end` does not come after `start`.
    pub fn between(id: SwingId, start: &Extremum, end: &Extremum) -> Option<Self> {
        if start.kind == end.kind || end.index <= start.index {
            return None;
        }
        let direction = match end.kind {
            ExtremumKind::High => SwingDirection::Up,
            ExtremumKind::Low => SwingDirection::Down,
        };
        Some(Self {
            id,
            start: start.clone(),
            end: end.clone(),
            direction,
            magnitude: (end.price - start.price).abs(),
            bar_count: end.index - start.index,
        })
    }

    pub fn high(&self) -> f64 {
        self.start.price.max(self.end.price)
    }

    pub fn low(&self) -> f64 {
        self.start.price.min(self.end.price)
    }

    pub fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// The price the swing was measured from. A close beyond it breaks the
    /// structure the swing describes.
    pub fn origin_price(&self) -> f64 {
        self.start.price
    }

    /// True if `close` lies beyond the swing's origin (below the low of an up
    /// swing, above the high of a down swing).
    pub fn is_broken_by(&self, close: f64) -> bool {
        match self.direction {
            SwingDirection::Up => close < self.start.price,
            SwingDirection::Down => close > self.start.price,
        }
    }
}
