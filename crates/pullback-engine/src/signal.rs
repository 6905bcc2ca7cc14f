//! HTF trend + LTF pullback signal.
//!
//! - HTF filter: the latest visible HTF bar must be green.
//! - Entry: previous LTF bar red, current LTF bar green.
//! - Exit: current LTF bar red.
//!
//! The HTF filter also gates the exit: while the latest visible HTF bar is
//! red or flat, an open position is held regardless of the LTF bars.

use pullback_core::traits::{BarWindow, SignalGenerator};
use pullback_core::types::Signal;

/// LTF bars required before any non-HOLD decision.
pub const MIN_LTF_BARS: usize = 2;
/// Visible HTF bars required before any non-HOLD decision.
pub const MIN_HTF_BARS: usize = 1;

/// Whether the histories are long enough for a decision.
#[inline]
pub fn has_minimum_data(ltf_len: usize, htf_len: usize) -> bool {
    ltf_len >= MIN_LTF_BARS && htf_len >= MIN_HTF_BARS
}

/// Multi-timeframe pullback signal. Holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PullbackSignal;

impl SignalGenerator for PullbackSignal {
    fn name(&self) -> &str {
        "HTF Pullback"
    }

    fn description(&self) -> &str {
        "Buys an LTF red-then-green pullback while the HTF bar is green; exits on the first red LTF bar"
    }

    fn evaluate(&self, ltf: &dyn BarWindow, htf: &dyn BarWindow, position_open: bool) -> Signal {
        if !has_minimum_data(ltf.len(), htf.len()) {
            return Signal::Hold;
        }

        let (Some(current), Some(previous), Some(trend)) =
            (ltf.from_back(0), ltf.from_back(1), htf.latest())
        else {
            return Signal::Hold;
        };

        if !trend.is_bullish() {
            return Signal::Hold;
        }

        if position_open {
            if current.is_bearish() {
                return Signal::Sell;
            }
        } else if previous.is_bearish() && current.is_bullish() {
            return Signal::Buy;
        }

        Signal::Hold
    }
}
