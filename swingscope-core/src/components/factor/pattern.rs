//! Corrective-pattern completion. While a completed A-B-C is active, its
//! Wave C termination is a reaction area in the resumption direction.

use crate::domain::{Bias, ConfluenceFactor, FactorType, SwingDirection};

use super::{FactorContext, FactorDetector};

#[derive(Debug, Clone, Copy, Default)]
pub struct PatternCompletion;

impl FactorDetector for PatternCompletion {
    fn name(&self) -> &str {
        "pattern_completion"
    }

    fn factor_types(&self) -> &[FactorType] {
        &[FactorType::PatternCompletion]
    }

    fn warmup_bars(&self) -> usize {
        0
    }

    fn evaluate(&self, ctx: &FactorContext<'_>) -> Vec<ConfluenceFactor> {
        let Some(pattern) = ctx.pattern.filter(|p| p.is_complete) else {
            return Vec::new();
        };
        let bias = match pattern.resumption_direction() {
            SwingDirection::Up => Bias::Bullish,
            SwingDirection::Down => Bias::Bearish,
        };
        ctx.factor(
            FactorType::PatternCompletion,
            pattern.quality_score,
            pattern.quality_score,
            pattern.completion_price(),
            bias,
        )
        .into_iter()
        .collect()
    }
}
