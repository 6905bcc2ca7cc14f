//! Flat/open position state machine.

use chrono::{DateTime, Utc};
use pullback_core::types::{Direction, ExitFill, OpenTrade, Signal, TradeRecord};
use serde::{Deserialize, Serialize};

/// Position state. Exactly one form exists at any time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    Open(OpenTrade),
}

/// Where and when a signal was observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    pub time: DateTime<Utc>,
    pub price: f64,
    /// 1-based LTF tick counter
    pub index: usize,
    /// Visible HTF bars so far
    pub htf_index: usize,
}

/// Result of applying a signal.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Transition {
    /// Signal consumed without a state change
    #[default]
    None,
    /// FLAT -> OPEN; the driver should open a position
    Opened(OpenTrade),
    /// OPEN -> FLAT; the driver should close the position and record the trade
    Closed(TradeRecord),
}

impl Transition {
    pub fn is_none(&self) -> bool {
        matches!(self, Transition::None)
    }
}

/// Turns signals into trades, one position at a time.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    symbol: String,
    state: PositionState,
}

impl PositionTracker {
    /// Create a flat tracker for `symbol`.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            state: PositionState::Flat,
        }
    }

    /// Apply a signal.
    ///
    /// BUY while open and SELL while flat are consumed as no-ops.
    pub fn apply(&mut self, signal: Signal, ctx: TickContext) -> Transition {
        match (signal, &self.state) {
            (Signal::Buy, PositionState::Flat) => {
                let trade = OpenTrade {
                    symbol: self.symbol.clone(),
                    direction: Direction::Long,
                    entry_time: ctx.time,
                    entry_price: ctx.price,
                    entry_index: ctx.index,
                    entry_htf_index: ctx.htf_index,
                };
                self.state = PositionState::Open(trade.clone());
                Transition::Opened(trade)
            }
            (Signal::Sell, PositionState::Open(_)) => self.close(ctx),
            _ => Transition::None,
        }
    }

    /// Close any open position regardless of signal.
    pub fn force_close(&mut self, ctx: TickContext) -> Option<TradeRecord> {
        match self.close(ctx) {
            Transition::Closed(record) => Some(record),
            _ => None,
        }
    }

    /// Undo a transition whose order could not be executed.
    ///
    /// Returns false, leaving the state untouched, if the tracker is not in
    /// the state the transition produced.
    pub fn revert(&mut self, transition: &Transition) -> bool {
        match (transition, &self.state) {
            (Transition::Opened(trade), PositionState::Open(current)) if current == trade => {
                self.state = PositionState::Flat;
                true
            }
            (Transition::Closed(record), PositionState::Flat) => {
                self.state = PositionState::Open(record.entry());
                true
            }
            (Transition::None, _) => true,
            _ => false,
        }
    }

    fn close(&mut self, ctx: TickContext) -> Transition {
        match std::mem::take(&mut self.state) {
            PositionState::Open(trade) => Transition::Closed(trade.close(ExitFill {
                time: ctx.time,
                price: ctx.price,
                index: ctx.index,
                htf_index: ctx.htf_index,
            })),
            PositionState::Flat => Transition::None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PositionState::Open(_))
    }

    pub fn state(&self) -> &PositionState {
        &self.state
    }

    pub fn open_trade(&self) -> Option<&OpenTrade> {
        match &self.state {
            PositionState::Open(trade) => Some(trade),
            PositionState::Flat => None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}
