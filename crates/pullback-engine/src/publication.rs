//! One-tick publication delay for completed HTF bars.

use pullback_core::types::Bar;
use tracing::debug;

use crate::aggregator::HtfAggregator;
use crate::history::History;

/// What the gate did on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GateStep {
    /// HTF bar that became visible this tick
    pub promoted: Option<Bar>,
    /// HTF bar that completed this tick and is now pending
    pub completed: Option<Bar>,
}

/// Holds a freshly completed HTF bar back for exactly one LTF tick.
///
/// Each tick must first promote the pending bar, then push the new LTF bar.
/// Reversing the two would publish a bar on the tick it completed.
#[derive(Debug, Clone)]
pub struct PublicationGate {
    aggregator: HtfAggregator,
    pending: Option<Bar>,
    visible: History,
}

impl PublicationGate {
    /// Create a gate publishing into `visible`.
    pub fn new(visible: History) -> Self {
        Self {
            aggregator: HtfAggregator::new(),
            pending: None,
            visible,
        }
    }

    /// Move the pending HTF bar, if any, into the visible history.
    pub fn promote_pending(&mut self) -> Option<Bar> {
        let bar = self.pending.take()?;
        self.visible.push(bar);
        debug!(
            htf_count = self.visible.total(),
            open = bar.open,
            close = bar.close,
            color = bar.color(),
            "HTF bar published"
        );
        Some(bar)
    }

    /// Feed an LTF bar to the aggregator. A completed HTF bar becomes the
    /// pending marker and is returned.
    pub fn push(&mut self, bar: Bar) -> Option<Bar> {
        let completed = self.aggregator.push(bar)?;
        debug!(
            open = completed.open,
            close = completed.close,
            "HTF bar completed, visible next tick"
        );
        self.pending = Some(completed);
        Some(completed)
    }

    /// Run one tick: promote, then push.
    pub fn on_tick(&mut self, bar: Bar) -> GateStep {
        let promoted = self.promote_pending();
        let completed = self.push(bar);
        GateStep {
            promoted,
            completed,
        }
    }

    /// HTF bar awaiting publication.
    pub fn pending(&self) -> Option<&Bar> {
        self.pending.as_ref()
    }

    /// HTF bars visible to signal evaluation.
    pub fn visible(&self) -> &History {
        &self.visible
    }

    /// HTF bars published so far.
    pub fn published(&self) -> usize {
        self.visible.total()
    }

    pub fn bucket_len(&self) -> usize {
        self.aggregator.bucket_len()
    }
}

impl Default for PublicationGate {
    fn default() -> Self {
        Self::new(History::new())
    }
}
