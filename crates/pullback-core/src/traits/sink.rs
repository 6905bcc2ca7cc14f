//! Output sinks for completed trades and accepted bars.

use crate::error::DataError;
use crate::types::{TimedBar, TradeRecord};

/// Receives completed trades in the order they close.
pub trait TradeSink: Send {
    /// Append one completed trade.
    fn record(&mut self, trade: &TradeRecord) -> Result<(), DataError>;

    /// Flush buffered output.
    fn flush(&mut self) -> Result<(), DataError> {
        Ok(())
    }
}

/// Receives every bar the engine accepts.
pub trait BarSink: Send {
    /// Append one accepted bar.
    fn record(&mut self, bar: &TimedBar) -> Result<(), DataError>;

    /// Flush buffered output.
    fn flush(&mut self) -> Result<(), DataError> {
        Ok(())
    }
}

impl TradeSink for Vec<TradeRecord> {
    fn record(&mut self, trade: &TradeRecord) -> Result<(), DataError> {
        self.push(trade.clone());
        Ok(())
    }
}

impl BarSink for Vec<TimedBar> {
    fn record(&mut self, bar: &TimedBar) -> Result<(), DataError> {
        self.push(*bar);
        Ok(())
    }
}

impl<T: TradeSink + ?Sized> TradeSink for Box<T> {
    fn record(&mut self, trade: &TradeRecord) -> Result<(), DataError> {
        (**self).record(trade)
    }

    fn flush(&mut self) -> Result<(), DataError> {
        (**self).flush()
    }
}

impl<T: BarSink + ?Sized> BarSink for Box<T> {
    fn record(&mut self, bar: &TimedBar) -> Result<(), DataError> {
        (**self).record(bar)
    }

    fn flush(&mut self) -> Result<(), DataError> {
        (**self).flush()
    }
}
