//! Candlestick reversal patterns: hammer / shooting star, doji, pin bar and
//! engulfing.
//!
//! Bullish readings are priced at the bar's low, bearish at its high, neutral
//! at the close, so they cluster with the level the bar reacted from.

use crate::config::{CandleRules, ReliabilityConfidence, StrategyConfig};
use crate::domain::{Bar, Bias, ConfluenceFactor, FactorType, Reliability};

use super::{FactorContext, FactorDetector};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandlePatterns {
    rules: CandleRules,
    confidence: ReliabilityConfidence,
}

impl CandlePatterns {
    pub fn new(rules: CandleRules, confidence: ReliabilityConfidence) -> Self {
        Self { rules, confidence }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.candle.clone(), config.reliability_confidence)
    }

    /// Hammer (long lower shadow, bullish) or shooting star (long upper
    /// shadow, bearish). The opposite shadow must be shorter than the body.
    pub fn hammer(&self, bar: &Bar) -> Option<(Bias, Reliability)> {
        let body = bar.body();
        if body <= 0.0 {
            return None;
        }
        let (lower, upper) = (bar.lower_shadow(), bar.upper_shadow());
        let ratio = self.rules.hammer_shadow_ratio;
        let (bias, shadow) = if lower >= ratio * body && upper < body {
            (Bias::Bullish, lower)
        } else if upper >= ratio * body && lower < body {
            (Bias::Bearish, upper)
        } else {
            return None;
        };
        Some((bias, self.rules.hammer_reliability.grade(shadow / body)))
    }

    /// Body ratio of a doji, if the bar is one.
    pub fn doji(&self, bar: &Bar) -> Option<f64> {
        let range = bar.range();
        if range <= 0.0 {
            return None;
        }
        let body_ratio = bar.body() / range;
        (body_ratio < self.rules.doji_body_ratio).then_some(body_ratio)
    }

    /// Pin bar direction and shadow fraction of the range.
    pub fn pin_bar(&self, bar: &Bar) -> Option<(Bias, f64)> {
        let range = bar.range();
        if range <= 0.0 {
            return None;
        }
        let lower = bar.lower_shadow() / range;
        let upper = bar.upper_shadow() / range;
        if lower >= self.rules.pin_shadow_ratio {
            Some((Bias::Bullish, lower))
        } else if upper >= self.rules.pin_shadow_ratio {
            Some((Bias::Bearish, upper))
        } else {
            None
        }
    }

    /// Engulfing: `current`'s body fully contains `previous`'s opposite-colour
    /// body, confirmed by higher volume.
    pub fn engulfing(&self, previous: &Bar, current: &Bar) -> Option<(Bias, Reliability)> {
        let (prev_body, body) = (previous.body(), current.body());
        if prev_body <= 0.0 || body <= prev_body || current.volume <= previous.volume {
            return None;
        }

        let bias = if previous.is_bearish()
            && current.is_bullish()
            && current.open <= previous.close
            && current.close >= previous.open
        {
            Bias::Bullish
        } else if previous.is_bullish()
            && current.is_bearish()
            && current.open >= previous.close
            && current.close <= previous.open
        {
            Bias::Bearish
        } else {
            return None;
        };

        let reliability = if body >= self.rules.engulfing_strong_multiple * prev_body {
            Reliability::Strong
        } else {
            Reliability::Moderate
        };
        Some((bias, reliability))
    }
}

fn anchor(bar: &Bar, bias: Bias) -> f64 {
    match bias {
        Bias::Bullish => bar.low,
        Bias::Bearish => bar.high,
        Bias::Neutral => bar.close,
    }
}

impl FactorDetector for CandlePatterns {
    fn name(&self) -> &str {
        "candle_patterns"
    }

    fn factor_types(&self) -> &[FactorType] {
        &[
            FactorType::Hammer,
            FactorType::Doji,
            FactorType::PinBar,
            FactorType::Engulfing,
        ]
    }

    fn warmup_bars(&self) -> usize {
        1
    }

    fn evaluate(&self, ctx: &FactorContext<'_>) -> Vec<ConfluenceFactor> {
        let bar = ctx.bar();
        let mut factors = Vec::new();

        if let Some((bias, reliability)) = self.hammer(bar) {
            factors.extend(ctx.factor(
                FactorType::Hammer,
                1.0,
                self.confidence.of(reliability),
                anchor(bar, bias),
                bias,
            ));
        }

        if let Some(body_ratio) = self.doji(bar) {
            factors.extend(ctx.factor(
                FactorType::Doji,
                1.0 - body_ratio,
                self.confidence.of(Reliability::Weak),
                anchor(bar, Bias::Neutral),
                Bias::Neutral,
            ));
        }

        if let Some((bias, shadow)) = self.pin_bar(bar) {
            let reliability = self.rules.pin_reliability.grade(shadow);
            factors.extend(ctx.factor(
                FactorType::PinBar,
                shadow,
                self.confidence.of(reliability),
                anchor(bar, bias),
                bias,
            ));
        }

        if let Some(previous) = ctx.previous() {
            if let Some((bias, reliability)) = self.engulfing(previous, bar) {
                factors.extend(ctx.factor(
                    FactorType::Engulfing,
                    1.0,
                    self.confidence.of(reliability),
                    anchor(bar, bias),
                    bias,
                ));
            }
        }

        factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::test_bars::bar;
    use crate::config::FactorWeights;

    fn evaluate_last(bars: &[Bar], weights: &FactorWeights) -> Vec<ConfluenceFactor> {
        let ctx = FactorContext {
            bars,
            bar_index: bars.len() - 1,
            levels: &[],
            reference: None,
            pattern: None,
            weights,
        };
        CandlePatterns::default().evaluate(&ctx)
    }

    fn types(factors: &[ConfluenceFactor]) -> Vec<FactorType> {
        factors.iter().map(|f| f.factor_type).collect()
    }

    #[test]
    fn hammer_and_pin_bar_on_long_lower_shadow() {
        // body 0.1, lower shadow 0.8, upper 0.05, range 0.95
        let b = bar(0, 10.8, 10.95, 10.0, 10.9, 100.0);
        let factors = evaluate_last(&[b], &FactorWeights::default());
        assert_eq!(types(&factors), vec![FactorType::Hammer, FactorType::PinBar]);
        for f in &factors {
            assert_eq!(f.bias, Bias::Bullish);
            assert_eq!(f.price_level, 10.0);
        }
        assert_eq!(factors[0].confidence, ReliabilityConfidence::default().strong);
        assert!((factors[1].value - 0.8 / 0.95).abs() < 1e-9);
    }

    #[test]
    fn shooting_star_is_bearish() {
        let b = bar(0, 10.1, 10.9, 9.98, 10.0, 100.0);
        let (bias, _) = CandlePatterns::default().hammer(&b).unwrap();
        assert_eq!(bias, Bias::Bearish);
        let factors = evaluate_last(&[b], &FactorWeights::default());
        assert!(factors.iter().all(|f| f.price_level == 10.9));
    }

    #[test]
    fn doji_is_neutral_at_close() {
        let b = bar(0, 10.0, 10.5, 9.5, 10.02, 100.0);
        let factors = evaluate_last(&[b], &FactorWeights::default());
        let doji = factors
            .iter()
            .find(|f| f.factor_type == FactorType::Doji)
            .unwrap();
        assert_eq!(doji.bias, Bias::Neutral);
        assert_eq!(doji.price_level, 10.02);
        assert!((doji.value - 0.98).abs() < 1e-9);
        // Equal shadows: neither a hammer nor a pin bar.
        assert_eq!(factors.len(), 1);
    }

    #[test]
    fn zero_range_bar_has_no_patterns() {
        let b = bar(0, 10.0, 10.0, 10.0, 10.0, 100.0);
        assert!(evaluate_last(&[b], &FactorWeights::default()).is_empty());
    }

    #[test]
    fn bullish_engulfing_needs_volume() {
        let prev = bar(0, 10.5, 10.6, 10.1, 10.2, 100.0);
        let curr = bar(1, 10.1, 10.85, 10.05, 10.8, 150.0);
        let detector = CandlePatterns::default();
        let (bias, reliability) = detector.engulfing(&prev, &curr).unwrap();
        assert_eq!(bias, Bias::Bullish);
        assert_eq!(reliability, Reliability::Strong);

        let quiet = bar(1, 10.1, 10.85, 10.05, 10.8, 90.0);
        assert!(detector.engulfing(&prev, &quiet).is_none());
    }

    #[test]
    fn bearish_engulfing_priced_at_high() {
        let prev = bar(0, 10.2, 10.6, 10.1, 10.5, 100.0);
        let curr = bar(1, 10.55, 10.65, 10.0, 10.1, 120.0);
        let factors = evaluate_last(&[prev, curr], &FactorWeights::default());
        let engulfing = factors
            .iter()
            .find(|f| f.factor_type == FactorType::Engulfing)
            .unwrap();
        assert_eq!(engulfing.bias, Bias::Bearish);
        assert_eq!(engulfing.price_level, 10.65);
    }

    #[test]
    fn partial_containment_is_not_engulfing() {
        let prev = bar(0, 10.5, 10.6, 10.1, 10.2, 100.0);
        // Closes below the previous open.
        let curr = bar(1, 10.1, 10.6, 10.05, 10.45, 150.0);
        assert!(CandlePatterns::default().engulfing(&prev, &curr).is_none());
    }

    #[test]
    fn thresholds_come_from_config() {
        // shadow / body = 3.5, shadow / range = 0.7
        let b = bar(0, 10.25, 10.375, 9.125, 10.0, 100.0);
        let defaults = CandlePatterns::default();
        assert_eq!(defaults.hammer(&b), Some((Bias::Bullish, Reliability::Moderate)));
        assert_eq!(defaults.pin_bar(&b).map(|(bias, _)| bias), Some(Bias::Bullish));

        let mut config = StrategyConfig::default();
        config.candle.hammer_shadow_ratio = 4.0;
        config.candle.pin_shadow_ratio = 0.75;
        let strict = CandlePatterns::from_config(&config);
        assert!(strict.hammer(&b).is_none());
        assert!(strict.pin_bar(&b).is_none());

        config.candle.hammer_shadow_ratio = 2.0;
        config.candle.hammer_reliability.strong = 3.5;
        config.reliability_confidence.strong = 0.95;
        let factors = {
            let bars = [b];
            let weights = FactorWeights::new([(FactorType::Hammer, 1.0)]);
            let ctx = FactorContext {
                bars: &bars,
                bar_index: 0,
                levels: &[],
                reference: None,
                pattern: None,
                weights: &weights,
            };
            CandlePatterns::from_config(&config).evaluate(&ctx)
        };
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].confidence, 0.95);
    }

    #[test]
    fn disabled_types_are_skipped() {
        let b = bar(0, 10.8, 10.95, 10.0, 10.9, 100.0);
        let weights = FactorWeights::new([(FactorType::PinBar, 1.0)]);
        let factors = evaluate_last(&[b], &weights);
        assert_eq!(types(&factors), vec![FactorType::PinBar]);
    }
}
