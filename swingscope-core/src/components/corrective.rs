//! A-B-C corrective pattern detection and quality scoring.
//!
//! A candidate is any four consecutive chain extrema starting at or after the
//! reference swing's end. Wave A must run counter to the reference swing, the
//! waves alternate, and the B/A and C/A ratios must fall inside the configured
//! windows. Every candidate ends at a confirmed extremum, so every reported
//! pattern is complete. Candidates are scored and only the single best is
//! returned (the most recent wins ties), so overlapping patterns are never
//! reported together.

use crate::config::PatternRules;
use crate::domain::{
    AbcWave, CorrectivePattern, Extremum, FibonacciLevel, LevelKind, PatternId, PatternType,
    Swing,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CorrectivePatternDetector {
    rules: PatternRules,
    fib_tolerance: f64,
}

impl CorrectivePatternDetector {
    pub fn new(rules: PatternRules, fib_tolerance: f64) -> Self {
        Self {
            rules,
            fib_tolerance,
        }
    }

    /// Best-scoring complete pattern among the most recent candidate windows.
    ///
    /// `levels` are the reference swing's levels, used for the Fibonacci
    /// confluence bonus on Wave C's termination.
    pub fn detect(
        &self,
        extrema: &[Extremum],
        reference: &Swing,
        levels: &[FibonacciLevel],
    ) -> Option<CorrectivePattern> {
        if extrema.len() < 4 {
            return None;
        }

        let mut best: Option<CorrectivePattern> = None;
        for end in (3..extrema.len()).rev().take(self.rules.scan_depth) {
            let window = &extrema[end - 3..=end];
            if window[0].index < reference.end.index {
                // Windows further back start even earlier.
                break;
            }
            if let Some(candidate) = self.evaluate(window, reference, levels) {
                let better = best
                    .as_ref()
                    .map_or(true, |b| candidate.quality_score > b.quality_score);
                if better {
                    best = Some(candidate);
                }
            }
        }

        if let Some(pattern) = &best {
            tracing::debug!(
                pattern_type = ?pattern.pattern_type,
                quality = pattern.quality_score,
                wave_b_ratio = pattern.wave_b_ratio,
                wave_c_ratio = pattern.wave_c_ratio,
                "corrective pattern selected"
            );
        }
        best
    }

    /// Validate and score one 4-extremum window.
    fn evaluate(
        &self,
        window: &[Extremum],
        reference: &Swing,
        levels: &[FibonacciLevel],
    ) -> Option<CorrectivePattern> {
        if window.windows(2).any(|pair| pair[0].kind == pair[1].kind) {
            return None;
        }

        let wave_a = AbcWave::between(&window[0], &window[1]);
        let wave_b = AbcWave::between(&window[1], &window[2]);
        let wave_c = AbcWave::between(&window[2], &window[3]);

        if wave_a.direction != reference.direction.opposite()
            || wave_b.direction == wave_a.direction
            || wave_c.direction == wave_b.direction
            || wave_a.magnitude <= 0.0
        {
            return None;
        }

        let rules = &self.rules;
        let wave_b_ratio = wave_b.magnitude / wave_a.magnitude;
        let wave_c_ratio = wave_c.magnitude / wave_a.magnitude;
        if !(rules.wave_b_min..=rules.wave_b_max).contains(&wave_b_ratio)
            || !(rules.wave_c_min..=rules.wave_c_max).contains(&wave_c_ratio)
        {
            return None;
        }

        let fibonacci_confluence = levels
            .iter()
            .filter(|l| {
                l.kind == LevelKind::Retracement
                    && l.is_near(wave_c.end_price, self.fib_tolerance)
            })
            .min_by(|a, b| {
                a.relative_distance(wave_c.end_price)
                    .total_cmp(&b.relative_distance(wave_c.end_price))
            })
            .map(|l| l.ratio);

        let quality_score = (rules.complete_score
            + self.score_wave_b(wave_b_ratio)
            + self.score_wave_c(wave_c_ratio)
            + fibonacci_confluence.map_or(0.0, |_| rules.fib_confluence_score))
        .clamp(0.0, 1.0);

        let pattern_type = if wave_c.magnitude < wave_b.magnitude && wave_b.magnitude < wave_a.magnitude
        {
            PatternType::Triangle
        } else if wave_b_ratio >= rules.flat_b_min {
            PatternType::Flat
        } else {
            PatternType::Zigzag
        };

        Some(CorrectivePattern {
            id: PatternId(0),
            wave_a,
            wave_b,
            wave_c,
            pattern_type,
            is_complete: true,
            quality_score,
            fibonacci_confluence,
            wave_b_ratio,
            wave_c_ratio,
            extrema: [window[0].id, window[1].id, window[2].id, window[3].id],
        })
    }

    /// Graded proximity of B/A to the ideal retracement band.
    fn score_wave_b(&self, ratio: f64) -> f64 {
        let rules = &self.rules;
        let distance = if ratio < rules.ideal_b_low {
            rules.ideal_b_low - ratio
        } else if ratio > rules.ideal_b_high {
            ratio - rules.ideal_b_high
        } else {
            0.0
        };

        if distance == 0.0 {
            rules.ideal_b_score
        } else if distance <= rules.ratio_tolerance {
            rules.near_ideal_b_score
        } else if distance <= 2.0 * rules.ratio_tolerance {
            rules.acceptable_b_score
        } else {
            0.0
        }
    }

    /// Best score among the Wave C targets within tolerance.
    fn score_wave_c(&self, ratio: f64) -> f64 {
        self.rules
            .wave_c_targets
            .iter()
            .filter(|t| (ratio - t.ratio).abs() <= self.rules.ratio_tolerance)
            .map(|t| t.score)
            .fold(0.0, f64::max)
    }
}
