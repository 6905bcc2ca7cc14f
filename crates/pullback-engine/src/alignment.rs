//! Wall-clock alignment of HTF buckets.
//!
//! A live stream can start at any minute. Bars are held back until one opens
//! on a minute that is a multiple of the bucket size, so every HTF bucket
//! covers a fixed clock window (:00-:04, :05-:09, ...).

use pullback_core::types::TimedBar;
use serde::{Deserialize, Serialize};

use crate::aggregator::HTF_BUCKET_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignmentState {
    Waiting,
    Aligned,
}

/// Discards bars until the first bucket boundary, then forwards everything.
#[derive(Debug, Clone)]
pub struct AlignmentGate {
    period: u32,
    state: AlignmentState,
}

impl AlignmentGate {
    /// Gate aligned to the HTF bucket size.
    pub fn new() -> Self {
        Self::with_period(HTF_BUCKET_SIZE as u32)
    }

    /// Gate aligned to an arbitrary minute period.
    pub fn with_period(period: u32) -> Self {
        Self {
            period: period.max(1),
            state: AlignmentState::Waiting,
        }
    }

    /// Whether `bar` opens on a bucket boundary.
    pub fn is_boundary(&self, bar: &TimedBar) -> bool {
        bar.minute() % self.period == 0
    }

    /// Decide whether `bar` is forwarded to the engine.
    ///
    /// Once a boundary bar has been seen the gate stays aligned for good.
    pub fn admit(&mut self, bar: &TimedBar) -> bool {
        if self.state == AlignmentState::Waiting {
            if !self.is_boundary(bar) {
                return false;
            }
            self.state = AlignmentState::Aligned;
        }
        true
    }

    pub fn state(&self) -> AlignmentState {
        self.state
    }

    pub fn is_aligned(&self) -> bool {
        self.state == AlignmentState::Aligned
    }

    pub fn period(&self) -> u32 {
        self.period
    }
}

impl Default for AlignmentGate {
    fn default() -> Self {
        Self::new()
    }
}
