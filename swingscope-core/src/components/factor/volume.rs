//! Volume anomaly: the current bar's volume against the trailing average of
//! the `window` bars before it.

use crate::config::{ReliabilityConfidence, ReliabilityCuts, StrategyConfig};
use crate::domain::{Bias, ConfluenceFactor, FactorType};

use super::{FactorContext, FactorDetector};

#[derive(Debug, Clone)]
pub struct VolumeSpike {
    window: usize,
    threshold: f64,
    /// Graded on ratio / threshold.
    reliability: ReliabilityCuts,
    value_cap: f64,
    confidence: ReliabilityConfidence,
}

impl VolumeSpike {
    /// Detector with the default grading and cap.
    pub fn new(window: usize, threshold: f64) -> Self {
        assert!(window >= 1, "window must be >= 1");
        assert!(
            threshold > 0.0 && threshold.is_finite(),
            "threshold must be positive and finite"
        );
        let defaults = StrategyConfig::default();
        Self {
            window,
            threshold,
            reliability: defaults.volume_reliability,
            value_cap: defaults.volume_value_cap,
            confidence: defaults.reliability_confidence,
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            reliability: config.volume_reliability,
            value_cap: config.volume_value_cap,
            confidence: config.reliability_confidence,
            ..Self::new(config.volume_window, config.volume_spike_threshold)
        }
    }

    /// Current volume divided by the trailing average, if the window is full
    /// and the average is non-zero.
    pub fn ratio(&self, ctx: &FactorContext<'_>) -> Option<f64> {
        if ctx.bar_index < self.window {
            return None;
        }
        let trailing = &ctx.bars[ctx.bar_index - self.window..ctx.bar_index];
        let average = trailing.iter().map(|b| b.volume).sum::<f64>() / self.window as f64;
        if average <= 0.0 {
            return None;
        }
        Some(ctx.bar().volume / average)
    }
}

impl FactorDetector for VolumeSpike {
    fn name(&self) -> &str {
        "volume_spike"
    }

    fn factor_types(&self) -> &[FactorType] {
        &[FactorType::VolumeSpike]
    }

    fn warmup_bars(&self) -> usize {
        self.window
    }

    fn evaluate(&self, ctx: &FactorContext<'_>) -> Vec<ConfluenceFactor> {
        let Some(ratio) = self.ratio(ctx) else {
            return Vec::new();
        };
        if ratio < self.threshold {
            return Vec::new();
        }

        let multiple = ratio / self.threshold;
        let reliability = self.reliability.grade(multiple);

        ctx.factor(
            FactorType::VolumeSpike,
            multiple.min(self.value_cap),
            self.confidence.of(reliability),
            ctx.bar().close,
            Bias::Neutral,
        )
        .into_iter()
        .collect()
    }
}
