//! Signal generation: a retracement-level touch confirmed by a confluence
//! zone becomes a trade candidate with a stop and extension targets.
//!
//! The generator only searches while the machine is in `TradeMode::Finding`.
//! A bare level touch never produces a signal, and neither does a zone made
//! only of level-proximity factors.

use serde::{Deserialize, Serialize};

use crate::components::levels::range_touches;
use crate::config::StrategyConfig;
use crate::domain::{
    Bar, Bias, ConfluenceZone, CorrectivePattern, FibonacciLevel, IdGen, LevelKind, QualityTier,
    Signal, SignalDirection, SignalId, Swing, ZoneStrength,
};

/// Two-state trade lifecycle of a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TradeMode {
    /// No open signal; new setups are searched for.
    Finding,
    /// One signal is open; only exits and invalidation are watched.
    Managing { signal_id: SignalId },
}

impl TradeMode {
    pub fn open_signal(self) -> Option<SignalId> {
        match self {
            Self::Finding => None,
            Self::Managing { signal_id } => Some(signal_id),
        }
    }
}

/// Market structure at the bar being evaluated.
#[derive(Debug, Clone, Copy)]
pub struct SetupContext<'a> {
    pub bar: &'a Bar,
    pub bar_index: usize,
    pub reference: &'a Swing,
    pub levels: &'a [FibonacciLevel],
    pub zones: &'a [ConfluenceZone],
    pub pattern: Option<&'a CorrectivePattern>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalGenerator {
    fib_tolerance: f64,
    zone_distance: f64,
    stop_buffer: f64,
    spread: f64,
    risk_percent: f64,
}

impl SignalGenerator {
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            fib_tolerance: config.fib_tolerance,
            zone_distance: config.confluence_distance.max(config.fib_tolerance),
            stop_buffer: config.stop_buffer(),
            spread: config.spread(),
            risk_percent: config.position_risk_percent,
        }
    }

    /// Evaluate one bar. Returns a new signal only in `Finding` mode.
    pub fn on_bar(&self, mode: TradeMode, ctx: &SetupContext<'_>, ids: &mut IdGen) -> Option<Signal> {
        if mode != TradeMode::Finding {
            return None;
        }

        let direction = SignalDirection::with_trend(ctx.reference.direction);
        let bias = match direction {
            SignalDirection::Long => Bias::Bullish,
            SignalDirection::Short => Bias::Bearish,
        };
        let bar = ctx.bar;

        let (level, zone) = self.confirmed_touch(ctx, bias)?;

        let entry_price = bar.close;
        let stop_price = match direction {
            SignalDirection::Long => bar.low - self.stop_buffer,
            SignalDirection::Short => bar.high + self.stop_buffer + self.spread,
        };
        if (entry_price - stop_price) * direction.sign() <= 0.0 {
            return None;
        }

        let mut target_prices: Vec<f64> = ctx
            .levels
            .iter()
            .filter(|l| l.kind == LevelKind::Extension)
            .map(|l| l.price)
            .filter(|&p| (p - entry_price) * direction.sign() > 0.0)
            .collect();
        target_prices.sort_by(|a, b| {
            (a - entry_price)
                .abs()
                .total_cmp(&(b - entry_price).abs())
        });
        let target_price = *target_prices.first()?;

        let pattern_support = ctx.pattern.is_some_and(|p| {
            p.is_complete && p.resumption_direction() == ctx.reference.direction
        });
        let quality_tier = match (zone.strength, pattern_support) {
            (ZoneStrength::Strong, true) => QualityTier::High,
            (ZoneStrength::Strong, false) | (ZoneStrength::Moderate, true) => QualityTier::Medium,
            _ => QualityTier::Low,
        };

        let signal = Signal {
            id: ids.signal(),
            bar_index: ctx.bar_index,
            timestamp: bar.timestamp,
            direction,
            entry_price,
            fibonacci_level: level.ratio,
            confidence: zone.mean_confidence(),
            stop_price,
            target_price,
            target_prices,
            quality_tier,
            swing_id: ctx.reference.id,
            risk_percent: self.risk_percent,
        };
        tracing::info!(
            signal = %signal.id,
            bar_index = signal.bar_index,
            direction = ?signal.direction,
            entry = signal.entry_price,
            stop = signal.stop_price,
            target = signal.target_price,
            level = signal.fibonacci_level,
            tier = ?signal.quality_tier,
            "signal emitted"
        );
        Some(signal)
    }

    /// The touched retracement level with the best confirming zone: at least
    /// moderate, voting in the trade direction, close to the level and holding
    /// a factor other than level proximity. Ties go to the level nearest the
    /// close.
    fn confirmed_touch<'a>(
        &self,
        ctx: &SetupContext<'a>,
        bias: Bias,
    ) -> Option<(&'a FibonacciLevel, &'a ConfluenceZone)> {
        let bar = ctx.bar;
        let mut best: Option<(&FibonacciLevel, &ConfluenceZone)> = None;

        for level in ctx.levels.iter().filter(|l| {
            l.kind == LevelKind::Retracement
                && range_touches(l, bar.low, bar.high, self.fib_tolerance)
        }) {
            let zone = ctx
                .zones
                .iter()
                .filter(|z| {
                    z.strength >= ZoneStrength::Moderate
                        && z.direction == bias
                        && z.has_confirming_factor()
                        && level.is_near(z.price_level, self.zone_distance)
                })
                .max_by(|a, b| a.weighted_score.total_cmp(&b.weighted_score));
            let Some(zone) = zone else {
                continue;
            };

            let better = match best {
                None => true,
                Some((best_level, best_zone)) => {
                    zone.weighted_score > best_zone.weighted_score
                        || (zone.weighted_score == best_zone.weighted_score
                            && level.relative_distance(bar.close)
                                < best_level.relative_distance(bar.close))
                }
            };
            if better {
                best = Some((level, zone));
            }
        }
        best
    }
}

/// True if `close` breaks the structure `reference` was measured from.
pub fn setup_invalidated(reference: &Swing, close: f64) -> bool {
    reference.is_broken_by(close)
}
