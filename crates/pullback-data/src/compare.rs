//! Live vs. backtest trade matching.
//!
//! Each live trade is paired with the backtest trade whose entry time is
//! closest. A pair matches when directions agree and both entry and exit
//! times are within the tolerance. Checking stops at the first mismatch.

use chrono::{DateTime, Duration, Utc};
use pullback_core::types::{Direction, TradeRecord};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A live trade and its closest backtest counterpart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeMatch {
    pub live_entry: DateTime<Utc>,
    pub backtest_entry: DateTime<Utc>,
    pub entry_diff_secs: i64,
    pub exit_diff_secs: i64,
}

/// Why a live trade failed to match.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum Mismatch {
    #[error("no backtest trades to compare against")]
    NoBacktestTrades,

    #[error("direction mismatch at {live_entry}: live {live} vs backtest {backtest}")]
    Direction {
        live_entry: DateTime<Utc>,
        live: Direction,
        backtest: Direction,
    },

    #[error("entry time mismatch at {live_entry}: {diff_secs}s apart")]
    EntryTime {
        live_entry: DateTime<Utc>,
        diff_secs: i64,
    },

    #[error("exit time mismatch at {live_entry}: {diff_secs}s apart")]
    ExitTime {
        live_entry: DateTime<Utc>,
        diff_secs: i64,
    },
}

/// Result of comparing two trade logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// Live trades examined, including a failing one
    pub checked: usize,
    /// Live trades that matched
    pub matched: usize,
    /// Live trades in the log
    pub live_trades: usize,
    pub matches: Vec<TradeMatch>,
    pub failure: Option<Mismatch>,
}

impl ComparisonReport {
    /// Whether every live trade matched.
    pub fn is_match(&self) -> bool {
        self.failure.is_none() && self.matched == self.live_trades
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TRADE MATCHING VALIDATION")?;
        writeln!(f, "═══════════════════════════════════════════════════════════")?;
        for m in &self.matches {
            writeln!(f, "Live trade entry: {}", m.live_entry)?;
            writeln!(f, "  Direction match")?;
            writeln!(f, "  Entry time difference: {}s", m.entry_diff_secs)?;
            writeln!(f, "  Exit time difference:  {}s", m.exit_diff_secs)?;
        }
        if let Some(failure) = &self.failure {
            writeln!(f, "{}", failure)?;
        }
        writeln!(f)?;
        writeln!(f, "SUMMARY")?;
        writeln!(f, "───────────────────────────────────────────────────────────")?;
        writeln!(f, "  Validated live trades: {}", self.checked)?;
        writeln!(f, "  Matched trades:        {}", self.matched)?;
        if self.is_match() {
            write!(f, "Trade logic matches between backtest and live execution")
        } else {
            write!(f, "Trade logic divergence detected")
        }
    }
}

/// Compare a live trade log against a backtest trade log.
pub fn compare_trades(
    live: &[TradeRecord],
    backtest: &[TradeRecord],
    tolerance: Duration,
) -> ComparisonReport {
    let mut report = ComparisonReport {
        checked: 0,
        matched: 0,
        live_trades: live.len(),
        matches: Vec::new(),
        failure: None,
    };

    for live_trade in live {
        report.checked += 1;

        let Some(bt_trade) = backtest
            .iter()
            .min_by_key(|bt| (bt.entry_time - live_trade.entry_time).abs())
        else {
            report.failure = Some(Mismatch::NoBacktestTrades);
            break;
        };

        let entry_diff = (bt_trade.entry_time - live_trade.entry_time).abs();
        let exit_diff = (bt_trade.exit_time - live_trade.exit_time).abs();

        if bt_trade.direction != live_trade.direction {
            report.failure = Some(Mismatch::Direction {
                live_entry: live_trade.entry_time,
                live: live_trade.direction,
                backtest: bt_trade.direction,
            });
            break;
        }
        if entry_diff > tolerance {
            report.failure = Some(Mismatch::EntryTime {
                live_entry: live_trade.entry_time,
                diff_secs: entry_diff.num_seconds(),
            });
            break;
        }
        if exit_diff > tolerance {
            report.failure = Some(Mismatch::ExitTime {
                live_entry: live_trade.entry_time,
                diff_secs: exit_diff.num_seconds(),
            });
            break;
        }

        report.matched += 1;
        report.matches.push(TradeMatch {
            live_entry: live_trade.entry_time,
            backtest_entry: bt_trade.entry_time,
            entry_diff_secs: entry_diff.num_seconds(),
            exit_diff_secs: exit_diff.num_seconds(),
        });
    }

    report
}
