//! Fractal detection: strict local highs/lows over a symmetric window.
//!
//! A candidate at `index` is a HIGH when its high is strictly greater than the
//! high of every bar in `[index - w, index - 1]` and `[index + 1, index + w]`;
//! LOW is the mirror on lows. Ties with any neighbor are ambiguous and yield
//! nothing, as does a bar that qualifies as both HIGH and LOW. Detection lags by
//! `w` bars: the right-hand side of the window must exist.

use crate::domain::{Bar, Extremum, ExtremumId, ExtremumKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ExtremumDetector {
    half_window: usize,
}

impl ExtremumDetector {
    pub fn new(half_window: usize) -> Self {
        assert!(half_window >= 1, "half_window must be >= 1");
        Self { half_window }
    }

    pub fn half_window(&self) -> usize {
        self.half_window
    }

    /// Index whose window completes when the bar at `newest` arrives.
    pub fn candidate_for(&self, newest: usize) -> Option<usize> {
        newest.checked_sub(self.half_window)
    }

    /// Check the single window centred on `index`.
    ///
    /// The returned extremum carries a placeholder id; the caller assigns the
    /// real one when it accepts the fractal.
    pub fn detect(&self, bars: &[Bar], index: usize) -> Option<Extremum> {
        let w = self.half_window;
        if index < w || index + w >= bars.len() {
            return None;
        }

        let centre = &bars[index];
        let neighbors = bars[index - w..index]
            .iter()
            .chain(bars[index + 1..=index + w].iter());

        let mut max_neighbor_high = f64::NEG_INFINITY;
        let mut min_neighbor_low = f64::INFINITY;
        for bar in neighbors {
            max_neighbor_high = max_neighbor_high.max(bar.high);
            min_neighbor_low = min_neighbor_low.min(bar.low);
        }

        let is_high = centre.high > max_neighbor_high;
        let is_low = centre.low < min_neighbor_low;

        let (kind, price, strength) = match (is_high, is_low) {
            (true, false) => (
                ExtremumKind::High,
                centre.high,
                centre.high - max_neighbor_high,
            ),
            (false, true) => (ExtremumKind::Low, centre.low, min_neighbor_low - centre.low),
            // Outside bar or no extreme at all.
            _ => return None,
        };

        Some(Extremum {
            id: ExtremumId(0),
            index,
            timestamp: centre.timestamp,
            price,
            kind,
            validation_window: w,
            strength,
        })
    }
}
