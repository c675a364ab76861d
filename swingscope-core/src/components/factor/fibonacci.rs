//! Fibonacci proximity: the bar trades at a retracement level of the
//! reference swing.
//!
//! A level counts when it lies inside the bar's low/high range widened by the
//! relative tolerance. Closing at the level is a stronger reading than merely
//! trading through it. Bias follows the reference swing: a pullback in an up
//! swing is a buying area, in a down swing a selling area.

use crate::components::levels::range_touches;
use crate::config::{ReliabilityConfidence, StrategyConfig};
use crate::domain::{Bias, ConfluenceFactor, FactorType, LevelKind, Reliability, SwingDirection};

use super::{FactorContext, FactorDetector};

#[derive(Debug, Clone)]
pub struct FibonacciProximity {
    tolerance: f64,
    confidence: ReliabilityConfidence,
}

impl FibonacciProximity {
    pub fn new(tolerance: f64, confidence: ReliabilityConfidence) -> Self {
        assert!(
            tolerance > 0.0 && tolerance.is_finite(),
            "tolerance must be positive and finite"
        );
        Self {
            tolerance,
            confidence,
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.fib_tolerance, config.reliability_confidence)
    }
}

impl FactorDetector for FibonacciProximity {
    fn name(&self) -> &str {
        "fibonacci_proximity"
    }

    fn factor_types(&self) -> &[FactorType] {
        &[FactorType::FibonacciLevel]
    }

    fn warmup_bars(&self) -> usize {
        0
    }

    fn evaluate(&self, ctx: &FactorContext<'_>) -> Vec<ConfluenceFactor> {
        let Some(reference) = ctx.reference else {
            return Vec::new();
        };
        let bias = match reference.direction {
            SwingDirection::Up => Bias::Bullish,
            SwingDirection::Down => Bias::Bearish,
        };
        let bar = ctx.bar();

        ctx.levels
            .iter()
            .filter(|l| {
                l.kind == LevelKind::Retracement
                    && range_touches(l, bar.low, bar.high, self.tolerance)
            })
            .filter_map(|level| {
                let reliability = if level.is_near(bar.close, self.tolerance) {
                    Reliability::Strong
                } else {
                    Reliability::Moderate
                };
                ctx.factor(
                    FactorType::FibonacciLevel,
                    1.0,
                    self.confidence.of(reliability),
                    level.price,
                    bias,
                )
            })
            .collect()
    }
}
