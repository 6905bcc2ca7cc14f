//! Read-only view over a chronological run of bars.

use crate::types::Bar;

/// Indexable window over bars, oldest first.
///
/// Signal logic only ever looks back from the newest bar, so access is
/// expressed relative to the end.
pub trait BarWindow {
    /// Number of bars in the window.
    fn len(&self) -> usize;

    /// Bar `n` positions back from the newest (0 = newest).
    fn from_back(&self, n: usize) -> Option<&Bar>;

    /// Check if the window is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Newest bar.
    fn latest(&self) -> Option<&Bar> {
        self.from_back(0)
    }
}

impl BarWindow for [Bar] {
    fn len(&self) -> usize {
        <[Bar]>::len(self)
    }

    fn from_back(&self, n: usize) -> Option<&Bar> {
        let len = <[Bar]>::len(self);
        if n < len {
            self.get(len - 1 - n)
        } else {
            None
        }
    }
}

impl BarWindow for Vec<Bar> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn from_back(&self, n: usize) -> Option<&Bar> {
        self.as_slice().from_back(n)
    }
}
