//! Signal generator trait definition.

use crate::traits::BarWindow;
use crate::types::Signal;

/// Trait for signal logic driven by LTF and HTF history.
///
/// Evaluation takes `&self`: implementations must not keep state between
/// calls, so identical inputs always produce the same signal no matter which
/// driver asks.
pub trait SignalGenerator: Send + Sync {
    /// Get the unique name of this generator.
    fn name(&self) -> &str;

    /// Decide on one tick.
    ///
    /// # Arguments
    /// * `ltf` - Closed LTF bars, oldest first
    /// * `htf` - Visible HTF bars, oldest first
    /// * `position_open` - Whether a position is currently open
    fn evaluate(&self, ltf: &dyn BarWindow, htf: &dyn BarWindow, position_open: bool) -> Signal;

    /// Get a description of the generator.
    fn description(&self) -> &str {
        ""
    }
}
