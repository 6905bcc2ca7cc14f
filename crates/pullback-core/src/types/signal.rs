//! Trading signal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision produced by a signal generator for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    /// Open a long position
    Buy,
    /// Close the open position
    Sell,
    /// Do nothing
    #[default]
    Hold,
}

impl Signal {
    /// Whether the signal asks for any action.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Signal::Hold)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        };
        write!(f, "{}", s)
    }
}
