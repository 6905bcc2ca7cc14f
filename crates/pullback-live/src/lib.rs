//! Live trading loop.
//!
//! Polls a [`BarSource`](pullback_core::traits::BarSource) for closed bars,
//! drops repeats, waits for an HTF boundary, then drives an
//! [`MtfEngine`](pullback_engine::MtfEngine) and turns its transitions into
//! orders.

mod duplicate;
mod trader;

pub use duplicate::DuplicateFilter;
pub use trader::{LiveConfig, LiveTrader, PollOutcome, SessionStats};
