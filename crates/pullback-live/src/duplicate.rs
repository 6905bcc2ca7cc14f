use pullback_core::types::TimedBar;

/// Passes a bar only if it is newer than every bar seen before.
///
/// Polling faster than the bar interval returns the same closed bar
/// repeatedly; those repeats are dropped here.
#[derive(Debug, Clone, Default)]
pub struct DuplicateFilter {
    last_timestamp: Option<i64>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `bar` and report whether it is new.
    pub fn is_new(&mut self, bar: &TimedBar) -> bool {
        match self.last_timestamp {
            Some(last) if bar.timestamp <= last => false,
            _ => {
                self.last_timestamp = Some(bar.timestamp);
                true
            }
        }
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_repeats_and_stale_bars() {
        let mut filter = DuplicateFilter::new();
        assert!(filter.is_new(&TimedBar::new(60_000, 1.0, 2.0)));
        assert!(!filter.is_new(&TimedBar::new(60_000, 1.0, 2.0)));
        assert!(!filter.is_new(&TimedBar::new(0, 1.0, 2.0)));
        assert!(filter.is_new(&TimedBar::new(120_000, 2.0, 3.0)));
        assert_eq!(filter.last_timestamp(), Some(120_000));
    }
}
