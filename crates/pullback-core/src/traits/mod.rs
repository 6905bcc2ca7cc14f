//! Core traits for the trading system.

mod bar_source;
mod executor;
mod signal;
mod sink;
mod window;

pub use bar_source::BarSource;
pub use executor::OrderExecutor;
pub use signal::SignalGenerator;
pub use sink::{BarSink, TradeSink};
pub use window::BarWindow;
