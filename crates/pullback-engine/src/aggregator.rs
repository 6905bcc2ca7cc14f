//! HTF bucket aggregation.

use pullback_core::types::Bar;

/// Number of LTF bars per HTF bar.
pub const HTF_BUCKET_SIZE: usize = 5;

/// Groups LTF bars into fixed-size buckets and synthesizes one HTF bar per
/// full bucket.
#[derive(Debug, Clone)]
pub struct HtfAggregator {
    bucket: Vec<Bar>,
}

impl HtfAggregator {
    pub fn new() -> Self {
        Self {
            bucket: Vec::with_capacity(HTF_BUCKET_SIZE),
        }
    }

    /// Add a bar to the current bucket.
    ///
    /// On the bucket's last bar, returns the HTF bar spanning the bucket
    /// (first open, last close) and starts a new bucket.
    pub fn push(&mut self, bar: Bar) -> Option<Bar> {
        self.bucket.push(bar);
        if self.bucket.len() < HTF_BUCKET_SIZE {
            return None;
        }

        let htf = Bar::new(self.bucket[0].open, self.bucket[HTF_BUCKET_SIZE - 1].close);
        self.bucket.clear();
        Some(htf)
    }

    /// Bars collected in the current bucket.
    #[inline]
    pub fn bucket_len(&self) -> usize {
        self.bucket.len()
    }
}

impl Default for HtfAggregator {
    fn default() -> Self {
        Self::new()
    }
}
