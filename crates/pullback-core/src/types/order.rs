//! Order side and execution receipts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Wire representation used by exchange APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Acknowledgement of a market order accepted by an executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Executor-assigned order ID
    pub order_id: String,
    /// Symbol traded
    pub symbol: String,
    /// Order side
    pub side: Side,
    /// Base-asset quantity, when the order was sized in units
    pub quantity: Option<Decimal>,
    /// Quote-asset amount, when the order was sized by notional
    pub notional: Option<Decimal>,
    /// Time the receipt was produced
    pub timestamp: DateTime<Utc>,
}
