//! Core data types for the trading system.

mod bar;
mod order;
mod signal;
mod timeframe;
mod trade;

pub use bar::{Bar, TimedBar};
pub use order::{OrderReceipt, Side};
pub use signal::Signal;
pub use timeframe::Timeframe;
pub use trade::{Direction, ExitFill, OpenTrade, TradeRecord};
