//! Price bar types.
//!
//! Only open and close are modeled; high/low extremes never influence a
//! decision, so they are not carried.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// An open/close price bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Opening price
    pub open: f64,
    /// Closing price
    pub close: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(open: f64, close: f64) -> Self {
        Self { open, close }
    }

    /// Check if the bar is bullish (close > open).
    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Check if the bar is bearish (close < open).
    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Signed body size: positive for bullish bars, negative for bearish.
    #[inline]
    pub fn body(&self) -> f64 {
        self.close - self.open
    }

    /// Short color label used in logs.
    pub fn color(&self) -> &'static str {
        if self.is_bullish() {
            "GREEN"
        } else if self.is_bearish() {
            "RED"
        } else {
            "FLAT"
        }
    }
}

/// A closed bar together with its open time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedBar {
    /// Unix timestamp in milliseconds (bar open time)
    pub timestamp: i64,
    /// Price data
    pub bar: Bar,
}

impl TimedBar {
    /// Create a new timed bar.
    pub fn new(timestamp: i64, open: f64, close: f64) -> Self {
        Self {
            timestamp,
            bar: Bar::new(open, close),
        }
    }

    /// Get the timestamp as a DateTime.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Minute of the hour of the bar open time (UTC).
    pub fn minute(&self) -> u32 {
        self.datetime().minute()
    }

    /// Reject bars the engine cannot reason about.
    ///
    /// Prices must be finite and non-negative.
    pub fn validate(&self) -> Result<(), DataError> {
        for (name, value) in [("open", self.bar.open), ("close", self.bar.close)] {
            if !value.is_finite() {
                return Err(DataError::InvalidBar {
                    timestamp: self.timestamp,
                    reason: format!("{} price is not finite", name),
                });
            }
            if value < 0.0 {
                return Err(DataError::InvalidBar {
                    timestamp: self.timestamp,
                    reason: format!("{} price is negative ({})", name, value),
                });
            }
        }
        Ok(())
    }
}
