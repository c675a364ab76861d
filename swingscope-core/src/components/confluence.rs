//! Confluence engine: runs the factor detectors on a bar and clusters their
//! readings by price into zones.

use crate::config::{FactorWeights, StrategyConfig, StrengthBands};
use crate::domain::{
    Bar, Bias, ConfluenceFactor, ConfluenceZone, CorrectivePattern, FibonacciLevel, Swing,
};

use super::factor::{default_detectors, FactorContext, FactorDetector};

#[derive(Debug)]
pub struct ConfluenceEngine {
    detectors: Vec<Box<dyn FactorDetector>>,
    weights: FactorWeights,
    distance: f64,
    min_factors: usize,
    bands: StrengthBands,
}

impl ConfluenceEngine {
    pub fn new(
        detectors: Vec<Box<dyn FactorDetector>>,
        weights: FactorWeights,
        distance: f64,
        min_factors: usize,
        bands: StrengthBands,
    ) -> Self {
        Self {
            detectors,
            weights,
            distance,
            min_factors,
            bands,
        }
    }

    /// The standard detector set with the config's weights and clustering
    /// parameters.
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(
            default_detectors(config),
            config.factor_weights.clone(),
            config.confluence_distance,
            config.min_factors,
            config.strength_bands.clone(),
        )
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Every factor present at `bar_index`. Detectors still in warmup are
    /// skipped; zero-weight factors are never produced.
    pub fn evaluate(
        &self,
        bars: &[Bar],
        bar_index: usize,
        levels: &[FibonacciLevel],
        reference: Option<&Swing>,
        pattern: Option<&CorrectivePattern>,
    ) -> Vec<ConfluenceFactor> {
        let ctx = FactorContext {
            bars,
            bar_index,
            levels,
            reference,
            pattern,
            weights: &self.weights,
        };
        self.detectors
            .iter()
            .filter(|d| bar_index >= d.warmup_bars())
            .flat_map(|d| d.evaluate(&ctx))
            .collect()
    }

    /// Cluster with this engine's distance, minimum size and bands.
    pub fn zones(&self, factors: &[ConfluenceFactor]) -> Vec<ConfluenceZone> {
        cluster(factors, self.distance, self.min_factors, &self.bands)
    }
}

/// Merge factors whose prices lie within `distance_tolerance` (relative to the
/// lowest price of the cluster) into zones, keeping only clusters of at least
/// `min_factors`. Zones come out in ascending price order.
pub fn cluster(
    factors: &[ConfluenceFactor],
    distance_tolerance: f64,
    min_factors: usize,
    bands: &StrengthBands,
) -> Vec<ConfluenceZone> {
    let mut sorted: Vec<&ConfluenceFactor> = factors
        .iter()
        .filter(|f| f.weight > 0.0 && f.price_level.is_finite() && f.price_level > 0.0)
        .collect();
    sorted.sort_by(|a, b| a.price_level.total_cmp(&b.price_level));

    let mut groups: Vec<Vec<&ConfluenceFactor>> = Vec::new();
    for factor in sorted {
        match groups.last_mut() {
            Some(group)
                if (factor.price_level - group[0].price_level) / group[0].price_level
                    <= distance_tolerance =>
            {
                group.push(factor);
            }
            _ => groups.push(vec![factor]),
        }
    }

    groups
        .into_iter()
        .filter(|g| g.len() >= min_factors.max(1))
        .map(|g| build_zone(&g, bands))
        .inspect(|zone| {
            tracing::debug!(
                price = zone.price_level,
                factors = zone.factor_count,
                weighted_score = zone.weighted_score,
                strength = ?zone.strength,
                direction = ?zone.direction,
                "confluence zone formed"
            );
        })
        .collect()
}

fn build_zone(group: &[&ConfluenceFactor], bands: &StrengthBands) -> ConfluenceZone {
    let total_score: f64 = group.iter().map(|f| f.value).sum();
    let weighted_score: f64 = group.iter().map(|f| f.weighted_value()).sum();

    let price_level = if weighted_score > 0.0 {
        group
            .iter()
            .map(|f| f.price_level * f.weighted_value())
            .sum::<f64>()
            / weighted_score
    } else {
        group.iter().map(|f| f.price_level).sum::<f64>() / group.len() as f64
    };

    let bullish = group.iter().filter(|f| f.bias == Bias::Bullish).count();
    let bearish = group.iter().filter(|f| f.bias == Bias::Bearish).count();
    let direction = match bullish.cmp(&bearish) {
        std::cmp::Ordering::Greater => Bias::Bullish,
        std::cmp::Ordering::Less => Bias::Bearish,
        std::cmp::Ordering::Equal => Bias::Neutral,
    };

    ConfluenceZone {
        price_level,
        factor_count: group.len(),
        total_score,
        weighted_score,
        strength: bands.classify(weighted_score),
        direction,
        factors: group.iter().map(|&f| f.clone()).collect(),
    }
}
