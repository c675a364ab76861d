//! Fibonacci retracement/extension levels of a swing.
//!
//! Up swing (low -> high): retracement = high - r * range, extension = high + r * range.
//! Down swing mirrors the signs around the low. Ratios are always supplied by
//! the caller; nothing is hard-coded here.

use crate::domain::{FibonacciLevel, LevelKind, Swing, SwingDirection};

#[derive(Debug, Clone, PartialEq)]
pub struct LevelCalculator {
    retracement_ratios: Vec<f64>,
    extension_ratios: Vec<f64>,
}

impl LevelCalculator {
    pub fn new(retracement_ratios: Vec<f64>, extension_ratios: Vec<f64>) -> Self {
        Self {
            retracement_ratios,
            extension_ratios,
        }
    }

    /// Levels for `swing` using this calculator's ratio sets.
    pub fn levels(&self, swing: &Swing) -> Vec<FibonacciLevel> {
        levels_for(swing, &self.retracement_ratios, &self.extension_ratios)
    }
}

/// Retracements (in ratio order) followed by extensions (in ratio order).
pub fn levels_for(
    swing: &Swing,
    retracement_ratios: &[f64],
    extension_ratios: &[f64],
) -> Vec<FibonacciLevel> {
    let range = swing.range();
    let (high, low) = (swing.high(), swing.low());

    let retracements = retracement_ratios.iter().map(|&ratio| FibonacciLevel {
        ratio,
        price: match swing.direction {
            SwingDirection::Up => high - ratio * range,
            SwingDirection::Down => low + ratio * range,
        },
        kind: LevelKind::Retracement,
    });

    let extensions = extension_ratios.iter().map(|&ratio| FibonacciLevel {
        ratio,
        price: match swing.direction {
            SwingDirection::Up => high + ratio * range,
            SwingDirection::Down => low - ratio * range,
        },
        kind: LevelKind::Extension,
    });

    retracements.chain(extensions).collect()
}

/// Retracement level nearest to `price` within `tolerance` (relative).
pub fn touched_retracement(
    levels: &[FibonacciLevel],
    price: f64,
    tolerance: f64,
) -> Option<&FibonacciLevel> {
    levels
        .iter()
        .filter(|l| l.kind == LevelKind::Retracement && l.is_near(price, tolerance))
        .min_by(|a, b| {
            a.relative_distance(price)
                .total_cmp(&b.relative_distance(price))
        })
}

/// True if `level` lies inside `[low, high]` widened by the relative `tolerance`.
pub fn range_touches(level: &FibonacciLevel, low: f64, high: f64, tolerance: f64) -> bool {
    level.price >= low * (1.0 - tolerance) && level.price <= high * (1.0 + tolerance)
}
