//! Data sources and sinks for trading.

mod compare;
mod csv_log;
mod csv_source;

pub use compare::{compare_trades, ComparisonReport, Mismatch, TradeMatch};
pub use csv_log::{load_trades, CsvBarLog, CsvTradeLog};
pub use csv_source::{parse_timestamp, CsvBarSource};

use pullback_core::error::DataError;
use pullback_core::types::TimedBar;
use std::path::Path;

/// Load bars from a candle log.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<TimedBar>, DataError> {
    CsvBarSource::new(path)?.load()
}
