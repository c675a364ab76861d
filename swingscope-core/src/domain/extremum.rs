//! Extremum: a confirmed local high or low ("fractal").

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::ids::ExtremumId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremumKind {
    High,
    Low,
}

impl ExtremumKind {
    pub fn opposite(self) -> Self {
        match self {
            Self::High => Self::Low,
            Self::Low => Self::High,
        }
    }
}

/// A local extreme validated by `validation_window` bars on both sides.
///
/// `strength` is the distance from `price` to the most extreme neighbor in the
/// window (the second-most-extreme value of the whole window).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extremum {
    pub id: ExtremumId,
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub kind: ExtremumKind,
    pub validation_window: usize,
    pub strength: f64,
}

impl Extremum {
    /// True if `self` lies beyond `other` in the direction of its kind
    /// (higher for highs, lower for lows).
    pub fn is_more_extreme_than(&self, other: &Extremum) -> bool {
        match self.kind {
            ExtremumKind::High => self.price > other.price,
            ExtremumKind::Low => self.price < other.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn extremum(kind: ExtremumKind, price: f64) -> Extremum {
        Extremum {
            id: ExtremumId(0),
            index: 5,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            price,
            kind,
            validation_window: 2,
            strength: 0.001,
        }
    }

    #[test]
    fn opposite_kind() {
        assert_eq!(ExtremumKind::High.opposite(), ExtremumKind::Low);
        assert_eq!(ExtremumKind::Low.opposite(), ExtremumKind::High);
    }

    #[test]
    fn more_extreme_follows_kind() {
        let high_a = extremum(ExtremumKind::High, 1.10);
        let high_b = extremum(ExtremumKind::High, 1.12);
        assert!(high_b.is_more_extreme_than(&high_a));
        assert!(!high_a.is_more_extreme_than(&high_b));

        let low_a = extremum(ExtremumKind::Low, 1.05);
        let low_b = extremum(ExtremumKind::Low, 1.04);
        assert!(low_b.is_more_extreme_than(&low_a));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ExtremumKind::High).unwrap();
        assert_eq!(json, "\"high\"");
    }
}
