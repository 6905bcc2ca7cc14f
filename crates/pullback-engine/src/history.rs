//! Append-only bar history with an optional ring-buffer cap.

use pullback_core::traits::BarWindow;
use pullback_core::types::Bar;
use std::collections::VecDeque;

/// Chronological bar history, oldest first.
///
/// Unbounded by default. With a capacity, only the newest `capacity` bars are
/// retained; [`History::total`] keeps counting every bar ever pushed.
#[derive(Debug, Clone, Default)]
pub struct History {
    /// Bars stored in a deque for efficient push/pop
    bars: VecDeque<Bar>,
    /// Maximum capacity (0 = unlimited)
    capacity: usize,
    /// Bars pushed over the lifetime of the history
    total: usize,
}

impl History {
    /// Create a new unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history that keeps only the last `capacity` bars.
    /// A capacity of 0 means unbounded.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    /// Push a new bar, removing the oldest if at capacity.
    pub fn push(&mut self, bar: Bar) {
        if self.capacity > 0 && self.bars.len() >= self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
        self.total += 1;
    }

    /// Number of retained bars.
    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Number of bars ever pushed, including evicted ones.
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the last bar.
    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Get a retained bar by index (0 = oldest retained).
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }

    /// Copy the retained bars out.
    pub fn to_vec(&self) -> Vec<Bar> {
        self.bars.iter().copied().collect()
    }
}

impl BarWindow for History {
    fn len(&self) -> usize {
        self.bars.len()
    }

    fn from_back(&self, n: usize) -> Option<&Bar> {
        let len = self.bars.len();
        if n < len {
            self.bars.get(len - 1 - n)
        } else {
            None
        }
    }
}
