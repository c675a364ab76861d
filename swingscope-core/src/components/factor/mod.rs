//! Confluence factor detectors.
//!
//! Each detector is a pure function of the recent bar window plus the current
//! market structure. Detectors never see open signals or outcomes: a factor
//! describes the market at one bar, not a trading decision.

pub mod candle;
pub mod fibonacci;
pub mod pattern;
pub mod volume;

use crate::config::{FactorWeights, StrategyConfig};
use crate::domain::{
    Bar, Bias, ConfluenceFactor, CorrectivePattern, FactorType, FibonacciLevel, Swing,
};

pub use candle::CandlePatterns;
pub use fibonacci::FibonacciProximity;
pub use pattern::PatternCompletion;
pub use volume::VolumeSpike;

/// Everything a detector may look at for the bar at `bar_index`.
///
/// Detectors must only read `bars[..=bar_index]`.
#[derive(Debug, Clone, Copy)]
pub struct FactorContext<'a> {
    pub bars: &'a [Bar],
    pub bar_index: usize,
    /// Levels of the reference swing (empty if none yet).
    pub levels: &'a [FibonacciLevel],
    pub reference: Option<&'a Swing>,
    pub pattern: Option<&'a CorrectivePattern>,
    pub weights: &'a FactorWeights,
}

impl<'a> FactorContext<'a> {
    pub fn bar(&self) -> &'a Bar {
        &self.bars[self.bar_index]
    }

    pub fn previous(&self) -> Option<&'a Bar> {
        self.bar_index.checked_sub(1).map(|i| &self.bars[i])
    }

    /// Build a factor stamped with this bar's time and its configured weight.
    ///
    /// Returns `None` for disabled (zero-weight) factor types so they are
    /// never emitted.
    pub fn factor(
        &self,
        factor_type: FactorType,
        value: f64,
        confidence: f64,
        price_level: f64,
        bias: Bias,
    ) -> Option<ConfluenceFactor> {
        let weight = self.weights.get(factor_type);
        if weight <= 0.0 {
            return None;
        }
        Some(ConfluenceFactor {
            factor_type,
            value,
            weight,
            confidence: confidence.clamp(0.0, 1.0),
            price_level,
            timestamp: self.bar().timestamp,
            bias,
        })
    }
}

/// Trait for confluence factor detectors.
pub trait FactorDetector: Send + Sync + std::fmt::Debug {
    /// Human-readable name (e.g., "volume_spike").
    fn name(&self) -> &str;

    /// Factor types this detector can emit.
    fn factor_types(&self) -> &[FactorType];

    /// Bars of history needed before this detector can produce output.
    fn warmup_bars(&self) -> usize;

    /// Factors present at `ctx.bar_index`. Empty when nothing fires.
    fn evaluate(&self, ctx: &FactorContext<'_>) -> Vec<ConfluenceFactor>;
}

/// The standard detector set, parameterized from `config`.
///
/// Detectors whose every factor type has zero weight are left out entirely.
pub fn default_detectors(config: &StrategyConfig) -> Vec<Box<dyn FactorDetector>> {
    let all: Vec<Box<dyn FactorDetector>> = vec![
        Box::new(FibonacciProximity::from_config(config)),
        Box::new(VolumeSpike::from_config(config)),
        Box::new(CandlePatterns::from_config(config)),
        Box::new(PatternCompletion),
    ];
    all.into_iter()
        .filter(|d| {
            d.factor_types()
                .iter()
                .any(|&t| config.factor_weights.is_enabled(t))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::test_bars::flat_bars;

    #[test]
    fn zero_weight_factor_is_never_built() {
        let bars = flat_bars(3, 1.0);
        let mut weights = FactorWeights::default();
        weights.set(FactorType::Doji, 0.0);
        let ctx = FactorContext {
            bars: &bars,
            bar_index: 2,
            levels: &[],
            reference: None,
            pattern: None,
            weights: &weights,
        };
        assert!(ctx
            .factor(FactorType::Doji, 1.0, 0.5, 1.0, Bias::Neutral)
            .is_none());
        let hammer = ctx
            .factor(FactorType::Hammer, 1.0, 1.4, 1.0, Bias::Bullish)
            .unwrap();
        assert_eq!(hammer.weight, 0.7);
        assert_eq!(hammer.confidence, 1.0);
        assert_eq!(hammer.timestamp, bars[2].timestamp);
    }

    #[test]
    fn default_set_drops_fully_disabled_detectors() {
        let mut config = StrategyConfig::default();
        assert_eq!(default_detectors(&config).len(), 4);

        config.factor_weights = FactorWeights::new([(FactorType::VolumeSpike, 1.0)]);
        let detectors = default_detectors(&config);
        assert_eq!(detectors.len(), 1);
        assert_eq!(detectors[0].name(), "volume_spike");

        config.factor_weights = FactorWeights::none();
        assert!(default_detectors(&config).is_empty());
    }

    #[test]
    fn previous_bar_at_series_start() {
        let bars = flat_bars(2, 1.0);
        let weights = FactorWeights::default();
        let ctx = FactorContext {
            bars: &bars,
            bar_index: 0,
            levels: &[],
            reference: None,
            pattern: None,
            weights: &weights,
        };
        assert!(ctx.previous().is_none());
    }
}
