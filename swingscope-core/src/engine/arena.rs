//! Append-only history with an optional cap.
//!
//! Items are only ever added at the back. With a limit set, the oldest items
//! are evicted first, so two machines fed the same bars always hold the same
//! window of history.

use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct Arena<T> {
    items: VecDeque<T>,
    limit: Option<usize>,
    evicted: usize,
}

impl<T> Arena<T> {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            items: VecDeque::new(),
            limit,
            evicted: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
        if let Some(limit) = self.limit {
            while self.items.len() > limit {
                self.items.pop_front();
                self.evicted += 1;
            }
        }
    }

    /// Replace the newest item if `matches` accepts it. Used when the tail of
    /// the extremum chain is superseded by a more extreme fractal.
    pub fn revise_last(&mut self, matches: impl FnOnce(&T) -> bool, item: T) -> bool {
        match self.items.back_mut() {
            Some(last) if matches(last) => {
                *last = item;
                true
            }
            _ => false,
        }
    }

    /// Remove the newest item if `matches` accepts it.
    pub fn retract_last(&mut self, matches: impl FnOnce(&T) -> bool) -> Option<T> {
        if self.items.back().is_some_and(matches) {
            self.items.pop_back()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items ever pushed, including evicted ones.
    pub fn total(&self) -> usize {
        self.items.len() + self.evicted
    }

    pub fn evicted(&self) -> usize {
        self.evicted
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }
}

impl<T: Clone> Arena<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<T: Serialize> Serialize for Arena<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}
