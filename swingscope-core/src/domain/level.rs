use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Retracement,
    Extension,
}

/// A price derived from a swing's range. Always recomputed from its swing,
/// never stored or mutated on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevel {
    pub ratio: f64,
    pub price: f64,
    pub kind: LevelKind,
}

impl FibonacciLevel {
    /// Relative distance from `price` to this level.
    pub fn relative_distance(&self, price: f64) -> f64 {
        if self.price == 0.0 {
            return f64::INFINITY;
        }
        ((price - self.price) / self.price).abs()
    }

    pub fn is_near(&self, price: f64, tolerance: f64) -> bool {
        self.relative_distance(price) <= tolerance
    }
}
