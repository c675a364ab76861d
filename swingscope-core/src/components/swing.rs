//! Swing tracking: links alternating extrema into swings and keeps the
//! dominant (largest-magnitude) swing per direction.
//!
//! Dominance is decided purely by magnitude: a corrective move cannot exceed
//! the impulse it corrects, so recency and momentum play no part. Equal
//! magnitudes keep the incumbent.

use std::collections::VecDeque;

use crate::domain::{Extremum, ExtremumId, ExtremumKind, IdGen, Swing, SwingDirection};

/// What happened to the alternating chain when a fractal arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainEvent {
    /// Opposite kind to the tail (or first extremum): appended.
    Appended,
    /// Same kind as the tail but more extreme: replaced the tail.
    Superseded(ExtremumId),
    /// Same kind as the tail and not more extreme: dropped.
    Ignored,
}

/// Result of feeding one fractal to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct SwingUpdate {
    pub chain: ChainEvent,
    pub swing: Option<Swing>,
    /// Set when the dominant swing of this direction was replaced.
    pub dominant_changed: Option<SwingDirection>,
}

impl SwingUpdate {
    fn ignored() -> Self {
        Self {
            chain: ChainEvent::Ignored,
            swing: None,
            dominant_changed: None,
        }
    }

    pub fn accepted(&self) -> bool {
        self.chain != ChainEvent::Ignored
    }
}

/// Swings of one direction still inside the lookback, plus the dominant one.
#[derive(Debug, Clone, Default, PartialEq)]
struct DirectionBook {
    recent: VecDeque<Swing>,
    dominant: Option<Swing>,
}

impl DirectionBook {
    /// Returns true if `swing` became dominant.
    fn offer(&mut self, swing: Swing) -> bool {
        let replaces = match &self.dominant {
            None => true,
            Some(current) => swing.magnitude > current.magnitude,
        };
        if replaces {
            self.dominant = Some(swing.clone());
        }
        self.recent.push_back(swing);
        replaces
    }

    /// Drop the swing ending at `end` (a superseded chain tail).
    fn withdraw(&mut self, end: ExtremumId) -> bool {
        if let Some(pos) = self.recent.iter().rposition(|s| s.end.id == end) {
            self.recent.remove(pos);
        }
        if self.dominant.as_ref().is_some_and(|d| d.end.id == end) {
            self.dominant = None;
            return true;
        }
        false
    }

    /// Largest remaining swing; the earliest wins ties.
    fn recompute(&mut self) {
        let mut best: Option<&Swing> = None;
        for swing in &self.recent {
            if best.map_or(true, |b| swing.magnitude > b.magnitude) {
                best = Some(swing);
            }
        }
        self.dominant = best.cloned();
    }

    /// Returns true if the dominant swing changed.
    fn expire(&mut self, oldest_end: usize) -> bool {
        let before = self.dominant.as_ref().map(|d| d.id);
        while self
            .recent
            .front()
            .is_some_and(|s| s.end.index < oldest_end)
        {
            self.recent.pop_front();
        }
        if self
            .dominant
            .as_ref()
            .is_some_and(|d| d.end.index < oldest_end)
        {
            self.recompute();
        }
        before != self.dominant.as_ref().map(|d| d.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwingTracker {
    lookback_bars: usize,
    chain: Vec<Extremum>,
    up: DirectionBook,
    down: DirectionBook,
    reference: Option<SwingDirection>,
}

impl SwingTracker {
    pub fn new(lookback_bars: usize) -> Self {
        assert!(lookback_bars >= 1, "lookback_bars must be >= 1");
        Self {
            lookback_bars,
            chain: Vec::new(),
            up: DirectionBook::default(),
            down: DirectionBook::default(),
            reference: None,
        }
    }

    fn book_mut(&mut self, direction: SwingDirection) -> &mut DirectionBook {
        match direction {
            SwingDirection::Up => &mut self.up,
            SwingDirection::Down => &mut self.down,
        }
    }

    /// Feed a newly confirmed fractal.
    ///
    /// The chain always alternates in kind: a same-kind fractal either
    /// supersedes a less extreme tail or is dropped.
    pub fn on_new_extremum(&mut self, extremum: Extremum, ids: &mut IdGen) -> SwingUpdate {
        let mut chain_event = ChainEvent::Appended;
        let mut dominant_lost = None;

        if let Some(tail) = self.chain.last() {
            if tail.kind == extremum.kind {
                if !extremum.is_more_extreme_than(tail) {
                    return SwingUpdate::ignored();
                }
                let replaced = tail.id;
                // The swing into the old tail has the same direction as the new one.
                let direction = match extremum.kind {
                    ExtremumKind::High => SwingDirection::Up,
                    ExtremumKind::Low => SwingDirection::Down,
                };
                if self.book_mut(direction).withdraw(replaced) {
                    dominant_lost = Some(direction);
                }
                self.chain.pop();
                chain_event = ChainEvent::Superseded(replaced);
            }
        }

        let swing = self
            .chain
            .last()
            .and_then(|start| Swing::between(ids.swing(), start, &extremum));
        self.chain.push(extremum);

        let mut dominant_changed = None;
        if let Some(swing) = &swing {
            let direction = swing.direction;
            if self.book_mut(direction).offer(swing.clone()) {
                dominant_changed = Some(direction);
            }
            tracing::debug!(
                swing = %swing.id,
                direction = ?direction,
                magnitude = swing.magnitude,
                "swing constructed"
            );
        }

        if let Some(direction) = dominant_lost {
            let book = self.book_mut(direction);
            if book.dominant.is_none() {
                book.recompute();
            }
            dominant_changed = Some(direction);
        }

        SwingUpdate {
            chain: chain_event,
            swing,
            dominant_changed,
        }
    }

    /// Retire swings that ended before the lookback window of `current_index`.
    /// Returns the directions whose dominant swing changed.
    pub fn expire(&mut self, current_index: usize) -> Vec<SwingDirection> {
        let Some(oldest_end) = current_index.checked_sub(self.lookback_bars) else {
            return Vec::new();
        };
        let mut changed = Vec::new();
        if self.up.expire(oldest_end) {
            changed.push(SwingDirection::Up);
        }
        if self.down.expire(oldest_end) {
            changed.push(SwingDirection::Down);
        }
        changed
    }

    /// Re-pick the reference swing: the larger of the two dominants, with the
    /// current reference kept on ties. Returns true if its direction changed.
    pub fn refresh_reference(&mut self) -> bool {
        let next = match (&self.up.dominant, &self.down.dominant) {
            (None, None) => None,
            (Some(_), None) => Some(SwingDirection::Up),
            (None, Some(_)) => Some(SwingDirection::Down),
            (Some(up), Some(down)) => {
                if up.magnitude > down.magnitude {
                    Some(SwingDirection::Up)
                } else if down.magnitude > up.magnitude {
                    Some(SwingDirection::Down)
                } else {
                    self.reference.or(Some(SwingDirection::Up))
                }
            }
        };
        let changed = next != self.reference;
        self.reference = next;
        changed
    }

    pub fn dominant(&self, direction: SwingDirection) -> Option<&Swing> {
        match direction {
            SwingDirection::Up => self.up.dominant.as_ref(),
            SwingDirection::Down => self.down.dominant.as_ref(),
        }
    }

    /// The dominant swing levels, patterns and signals are measured on.
    pub fn reference(&self) -> Option<&Swing> {
        self.reference.and_then(|d| self.dominant(d))
    }

    /// Swings of `direction` still competing for dominance.
    pub fn candidates(&self, direction: SwingDirection) -> impl Iterator<Item = &Swing> {
        match direction {
            SwingDirection::Up => self.up.recent.iter(),
            SwingDirection::Down => self.down.recent.iter(),
        }
    }

    /// The alternating chain of confirmed extrema, oldest first.
    pub fn chain(&self) -> &[Extremum] {
        &self.chain
    }

    /// Keep only the newest `keep` chain entries.
    pub fn trim_chain(&mut self, keep: usize) {
        if self.chain.len() > keep {
            self.chain.drain(..self.chain.len() - keep);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(ids: &mut IdGen, index: usize, price: f64, kind: ExtremumKind) -> Extremum {
        Extremum {
            id: ids.extremum(),
            index,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            price,
            kind,
            validation_window: 2,
            strength: 0.0,
        }
    }

    fn feed(tracker: &mut SwingTracker, ids: &mut IdGen, points: &[(usize, f64, ExtremumKind)]) {
        for &(index, price, kind) in points {
            let x = point(ids, index, price, kind);
            tracker.on_new_extremum(x, ids);
        }
    }

    #[test]
    fn first_extremum_builds_no_swing() {
        let mut ids = IdGen::default();
        let mut tracker = SwingTracker::new(100);
        let update = tracker.on_new_extremum(point(&mut ids, 3, 1.08, ExtremumKind::Low), &mut ids);
        assert_eq!(update.chain, ChainEvent::Appended);
        assert!(update.swing.is_none());
        assert!(tracker.reference().is_none());
    }

    #[test]
    fn opposite_kind_builds_swing_and_dominant() {
        let mut ids = IdGen::default();
        let mut tracker = SwingTracker::new(100);
        tracker.on_new_extremum(point(&mut ids, 3, 1.08, ExtremumKind::Low), &mut ids);
        let update = tracker.on_new_extremum(point(&mut ids, 9, 1.09, ExtremumKind::High), &mut ids);

        let swing = update.swing.unwrap();
        assert_eq!(swing.direction, SwingDirection::Up);
        assert!((swing.magnitude - 0.01).abs() < 1e-12);
        assert_eq!(update.dominant_changed, Some(SwingDirection::Up));
        assert_eq!(tracker.dominant(SwingDirection::Up).unwrap().id, swing.id);
    }

    #[test]
    fn smaller_swing_does_not_replace_dominant() {
        let mut ids = IdGen::default();
        let mut tracker = SwingTracker::new(100);
        feed(
            &mut tracker,
            &mut ids,
            &[
                (2, 1.00, ExtremumKind::Low),
                (8, 1.20, ExtremumKind::High),
                (12, 1.10, ExtremumKind::Low),
                (16, 1.15, ExtremumKind::High),
            ],
        );
        let up = tracker.dominant(SwingDirection::Up).unwrap();
        assert_eq!(up.start.index, 2);
        assert_eq!(up.end.index, 8);
        assert_eq!(tracker.candidates(SwingDirection::Up).count(), 2);
    }

    #[test]
    fn equal_magnitude_keeps_incumbent() {
        let mut ids = IdGen::default();
        let mut tracker = SwingTracker::new(100);
        feed(
            &mut tracker,
            &mut ids,
            &[
                (2, 1.0, ExtremumKind::Low),
                (6, 1.5, ExtremumKind::High),
                (10, 1.25, ExtremumKind::Low),
            ],
        );
        let incumbent = tracker.dominant(SwingDirection::Up).unwrap().id;
        let update = tracker.on_new_extremum(point(&mut ids, 14, 1.75, ExtremumKind::High), &mut ids);
        assert_eq!(update.swing.unwrap().magnitude, 0.5);
        assert_eq!(update.dominant_changed, None);
        assert_eq!(tracker.dominant(SwingDirection::Up).unwrap().id, incumbent);
    }

    #[test]
    fn same_kind_more_extreme_supersedes_tail() {
        let mut ids = IdGen::default();
        let mut tracker = SwingTracker::new(100);
        feed(
            &mut tracker,
            &mut ids,
            &[(2, 1.00, ExtremumKind::Low), (6, 1.10, ExtremumKind::High)],
        );
        let old_tail = tracker.chain().last().unwrap().id;
        let update = tracker.on_new_extremum(point(&mut ids, 9, 1.12, ExtremumKind::High), &mut ids);

        assert_eq!(update.chain, ChainEvent::Superseded(old_tail));
        let swing = update.swing.unwrap();
        assert_eq!(swing.start.index, 2);
        assert_eq!(swing.end.index, 9);
        assert_eq!(tracker.chain().len(), 2);
        assert_eq!(tracker.dominant(SwingDirection::Up).unwrap().id, swing.id);
        // The superseded swing no longer competes.
        assert_eq!(tracker.candidates(SwingDirection::Up).count(), 1);
    }

    #[test]
    fn same_kind_less_extreme_is_ignored() {
        let mut ids = IdGen::default();
        let mut tracker = SwingTracker::new(100);
        feed(
            &mut tracker,
            &mut ids,
            &[(2, 1.00, ExtremumKind::Low), (6, 1.10, ExtremumKind::High)],
        );
        let update = tracker.on_new_extremum(point(&mut ids, 9, 1.08, ExtremumKind::High), &mut ids);
        assert_eq!(update.chain, ChainEvent::Ignored);
        assert!(!update.accepted());
        assert_eq!(tracker.chain().last().unwrap().price, 1.10);
    }

    #[test]
    fn chain_alternates() {
        let mut ids = IdGen::default();
        let mut tracker = SwingTracker::new(100);
        feed(
            &mut tracker,
            &mut ids,
            &[
                (2, 1.00, ExtremumKind::Low),
                (4, 0.98, ExtremumKind::Low),
                (6, 1.10, ExtremumKind::High),
                (8, 1.11, ExtremumKind::High),
                (10, 1.05, ExtremumKind::Low),
                (12, 1.06, ExtremumKind::Low),
            ],
        );
        let kinds: Vec<_> = tracker.chain().iter().map(|x| x.kind).collect();
        assert_eq!(
            kinds,
            vec![ExtremumKind::Low, ExtremumKind::High, ExtremumKind::Low]
        );
    }

    #[test]
    fn expired_dominant_is_recomputed() {
        let mut ids = IdGen::default();
        let mut tracker = SwingTracker::new(20);
        feed(
            &mut tracker,
            &mut ids,
            &[
                (2, 1.00, ExtremumKind::Low),
                (8, 1.30, ExtremumKind::High),
                (14, 1.20, ExtremumKind::Low),
                (20, 1.25, ExtremumKind::High),
            ],
        );
        assert_eq!(tracker.dominant(SwingDirection::Up).unwrap().end.index, 8);

        let changed = tracker.expire(30);
        assert!(changed.contains(&SwingDirection::Up));
        assert_eq!(tracker.dominant(SwingDirection::Up).unwrap().end.index, 20);

        tracker.expire(45);
        assert!(tracker.dominant(SwingDirection::Up).is_none());
    }

    #[test]
    fn reference_is_larger_dominant() {
        let mut ids = IdGen::default();
        let mut tracker = SwingTracker::new(100);
        feed(
            &mut tracker,
            &mut ids,
            &[
                (2, 1.00, ExtremumKind::Low),
                (8, 1.20, ExtremumKind::High),
                (14, 1.12, ExtremumKind::Low),
            ],
        );
        assert!(tracker.refresh_reference());
        assert_eq!(tracker.reference().unwrap().direction, SwingDirection::Up);
        assert!(!tracker.refresh_reference());

        feed(&mut tracker, &mut ids, &[(18, 1.15, ExtremumKind::High), (24, 0.90, ExtremumKind::Low)]);
        assert!(tracker.refresh_reference());
        assert_eq!(tracker.reference().unwrap().direction, SwingDirection::Down);
    }
}
