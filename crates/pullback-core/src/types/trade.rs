//! Open trades and completed trade records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction. Only long trades are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Long,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
        }
    }
}

/// A position that has been entered but not yet exited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenTrade {
    pub symbol: String,
    pub direction: Direction,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    /// 1-based LTF tick counter at entry
    pub entry_index: usize,
    /// Number of visible HTF bars at entry
    pub entry_htf_index: usize,
}

/// Exit side of a trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    pub time: DateTime<Utc>,
    pub price: f64,
    pub index: usize,
    pub htf_index: usize,
}

impl OpenTrade {
    /// Complete the trade.
    pub fn close(self, exit: ExitFill) -> TradeRecord {
        TradeRecord {
            symbol: self.symbol,
            direction: self.direction,
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            entry_index: self.entry_index,
            entry_htf_index: self.entry_htf_index,
            exit_time: exit.time,
            exit_price: exit.price,
            exit_index: exit.index,
            exit_htf_index: exit.htf_index,
        }
    }
}

/// A completed round-trip trade.
///
/// Field names in serialized form match the trade log columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub direction: Direction,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    #[serde(rename = "entry_candle")]
    pub entry_index: usize,
    #[serde(rename = "entry_htf")]
    pub entry_htf_index: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    #[serde(rename = "exit_candle")]
    pub exit_index: usize,
    #[serde(rename = "exit_htf")]
    pub exit_htf_index: usize,
}

impl TradeRecord {
    /// Recover the entry half of the trade.
    pub fn entry(&self) -> OpenTrade {
        OpenTrade {
            symbol: self.symbol.clone(),
            direction: self.direction,
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            entry_index: self.entry_index,
            entry_htf_index: self.entry_htf_index,
        }
    }

    /// Profit per unit (exit - entry for longs).
    pub fn pnl(&self) -> f64 {
        match self.direction {
            Direction::Long => self.exit_price - self.entry_price,
        }
    }

    /// Profit as a percentage of the entry price.
    pub fn pnl_pct(&self) -> f64 {
        if self.entry_price == 0.0 {
            0.0
        } else {
            self.pnl() / self.entry_price * 100.0
        }
    }

    /// Number of LTF bars the trade was held.
    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_trade() -> OpenTrade {
        OpenTrade {
            symbol: "BTCUSDT".to_string(),
            direction: Direction::Long,
            entry_time: DateTime::from_timestamp(1_705_312_800, 0).unwrap(),
            entry_price: 100.0,
            entry_index: 7,
            entry_htf_index: 1,
        }
    }

    #[test]
    fn test_close_and_entry_round_trip() {
        let open = open_trade();
        let record = open.clone().close(ExitFill {
            time: DateTime::from_timestamp(1_705_313_100, 0).unwrap(),
            price: 110.0,
            index: 12,
            htf_index: 2,
        });

        assert_eq!(record.entry(), open);
        assert_eq!(record.exit_index, 12);
        assert!((record.pnl() - 10.0).abs() < 1e-9);
        assert!((record.pnl_pct() - 10.0).abs() < 1e-9);
        assert_eq!(record.bars_held(), 5);
    }

    #[test]
    fn test_serialized_column_names() {
        let record = open_trade().close(ExitFill {
            time: DateTime::from_timestamp(1_705_313_100, 0).unwrap(),
            price: 95.0,
            index: 9,
            htf_index: 1,
        });
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["direction"], "LONG");
        assert_eq!(json["entry_candle"], 7);
        assert_eq!(json["exit_htf"], 1);
        assert!(record.pnl() < 0.0);
    }
}
