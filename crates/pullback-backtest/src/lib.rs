//! Historical replay.
//!
//! Feeds a recorded bar sequence through the same [`MtfEngine`] the live
//! trader uses and reports the resulting trades.
//!
//! [`MtfEngine`]: pullback_engine::MtfEngine

mod report;
mod runner;
mod statistics;

pub use report::BacktestReport;
pub use runner::{run_csv, ReplayConfig, ReplayRunner, SignalEvent};
pub use statistics::BacktestStats;
