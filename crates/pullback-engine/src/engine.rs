//! Per-run engine state and the per-tick pipeline.

use chrono::{DateTime, Utc};
use pullback_core::error::{TradingError, TradingResult};
use pullback_core::traits::SignalGenerator;
use pullback_core::types::{Bar, OpenTrade, Signal, TimedBar, TradeRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::history::History;
use crate::position::{PositionState, PositionTracker, TickContext, Transition};
use crate::publication::PublicationGate;
use crate::signal::{has_minimum_data, PullbackSignal, MIN_LTF_BARS};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Symbol recorded on trades
    pub symbol: String,
    /// Bars retained in each history (0 = unbounded)
    pub history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            history_capacity: 0,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> TradingResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(TradingError::Config("symbol must not be empty".into()));
        }
        if self.history_capacity != 0 && self.history_capacity < MIN_LTF_BARS {
            return Err(TradingError::Config(format!(
                "history_capacity must be 0 (unbounded) or at least {}, got {}",
                MIN_LTF_BARS, self.history_capacity
            )));
        }
        Ok(())
    }
}

/// Everything that happened on one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// 1-based LTF tick counter
    pub index: usize,
    pub timestamp: i64,
    pub bar: Bar,
    /// HTF bar published at the start of this tick
    pub promoted: Option<Bar>,
    /// HTF bar completed by this tick, visible next tick
    pub completed: Option<Bar>,
    /// True while the minimum LTF/HTF history is not yet available
    pub warming_up: bool,
    pub signal: Signal,
    pub transition: Transition,
}

impl TickOutcome {
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// Counters for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineStats {
    pub ticks: usize,
    pub htf_bars: usize,
    pub trades_closed: usize,
    pub bucket_len: usize,
    pub position_open: bool,
}

/// Multi-timeframe engine.
///
/// Synchronous and self-contained: no I/O, no clocks, no shared state.
/// Drivers own one instance each and call [`MtfEngine::on_bar`] once per
/// new closed bar.
#[derive(Debug, Clone)]
pub struct MtfEngine<G = PullbackSignal> {
    config: EngineConfig,
    generator: G,
    ltf: History,
    gate: PublicationGate,
    tracker: PositionTracker,
    ticks: usize,
    trades_closed: usize,
    last_bar: Option<TimedBar>,
}

impl MtfEngine<PullbackSignal> {
    /// Create an engine running the pullback signal.
    pub fn new(config: EngineConfig) -> TradingResult<Self> {
        Self::with_generator(config, PullbackSignal)
    }
}

impl<G: SignalGenerator> MtfEngine<G> {
    /// Create an engine with a custom signal generator.
    pub fn with_generator(config: EngineConfig, generator: G) -> TradingResult<Self> {
        config.validate()?;
        Ok(Self {
            ltf: History::with_capacity(config.history_capacity),
            gate: PublicationGate::new(History::with_capacity(config.history_capacity)),
            tracker: PositionTracker::new(config.symbol.clone()),
            config,
            generator,
            ticks: 0,
            trades_closed: 0,
            last_bar: None,
        })
    }

    /// Process one new closed bar.
    ///
    /// The bar must be valid (see [`TimedBar::validate`]) and newer than any
    /// bar seen before.
    pub fn on_bar(&mut self, bar: TimedBar) -> TickOutcome {
        self.ticks += 1;
        self.last_bar = Some(bar);

        let promoted = self.gate.promote_pending();
        self.ltf.push(bar.bar);
        let completed = self.gate.push(bar.bar);

        let visible = self.gate.visible();
        let warming_up = !has_minimum_data(self.ltf.len(), visible.len());
        let signal = if warming_up {
            Signal::Hold
        } else {
            self.generator
                .evaluate(&self.ltf, visible, self.tracker.is_open())
        };

        let ctx = self.context(&bar);
        let transition = self.tracker.apply(signal, ctx);
        if matches!(transition, Transition::Closed(_)) {
            self.trades_closed += 1;
        }

        debug!(
            tick = self.ticks,
            signal = %signal,
            warming_up,
            position_open = self.tracker.is_open(),
            "tick evaluated"
        );

        TickOutcome {
            index: self.ticks,
            timestamp: bar.timestamp,
            bar: bar.bar,
            promoted,
            completed,
            warming_up,
            signal,
            transition,
        }
    }

    /// Undo the position change of a tick whose order failed.
    pub fn revert(&mut self, transition: &Transition) -> bool {
        let reverted = self.tracker.revert(transition);
        if reverted && matches!(transition, Transition::Closed(_)) {
            self.trades_closed -= 1;
        }
        reverted
    }

    /// Close the open position at the last accepted bar.
    pub fn force_close(&mut self) -> Option<TradeRecord> {
        let last = self.last_bar?;
        let ctx = self.context(&last);
        let record = self.tracker.force_close(ctx)?;
        self.trades_closed += 1;
        Some(record)
    }

    fn context(&self, bar: &TimedBar) -> TickContext {
        TickContext {
            time: bar.datetime(),
            price: bar.bar.close,
            index: self.ticks,
            htf_index: self.gate.published(),
        }
    }

    pub fn ltf(&self) -> &History {
        &self.ltf
    }

    /// HTF bars visible to the signal.
    pub fn htf(&self) -> &History {
        self.gate.visible()
    }

    pub fn pending_htf(&self) -> Option<&Bar> {
        self.gate.pending()
    }

    pub fn position(&self) -> &PositionState {
        self.tracker.state()
    }

    pub fn is_position_open(&self) -> bool {
        self.tracker.is_open()
    }

    pub fn open_trade(&self) -> Option<&OpenTrade> {
        self.tracker.open_trade()
    }

    pub fn last_bar(&self) -> Option<&TimedBar> {
        self.last_bar.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            ticks: self.ticks,
            htf_bars: self.gate.published(),
            trades_closed: self.trades_closed,
            bucket_len: self.gate.bucket_len(),
            position_open: self.tracker.is_open(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::HTF_BUCKET_SIZE;

    /// 2024-01-15 10:00:00 UTC
    const START: i64 = 1_705_312_800_000;

    fn bar(i: usize, open: f64, close: f64) -> TimedBar {
        TimedBar::new(START + i as i64 * 60_000, open, close)
    }

    fn green(i: usize) -> TimedBar {
        bar(i, 100.0, 101.0)
    }

    fn red(i: usize) -> TimedBar {
        bar(i, 101.0, 100.0)
    }

    fn engine() -> MtfEngine {
        MtfEngine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_rejects_capacity_one() {
        let config = EngineConfig {
            history_capacity: 1,
            ..Default::default()
        };
        assert!(MtfEngine::new(config).is_err());
    }

    #[test]
    fn test_warmup_until_first_htf_is_visible() {
        let mut engine = engine();
        for i in 0..HTF_BUCKET_SIZE {
            let outcome = engine.on_bar(green(i));
            assert!(outcome.warming_up);
            assert_eq!(outcome.signal, Signal::Hold);
        }
        assert_eq!(engine.pending_htf(), Some(&Bar::new(100.0, 101.0)));

        let outcome = engine.on_bar(red(5));
        assert!(!outcome.warming_up);
        assert_eq!(outcome.promoted, Some(Bar::new(100.0, 101.0)));
        assert_eq!(engine.htf().len(), 1);
    }

    #[test]
    fn test_entry_and_exit_indices() {
        let mut engine = engine();
        for i in 0..HTF_BUCKET_SIZE {
            engine.on_bar(green(i));
        }
        // Tick 6: HTF published, red pullback.
        assert_eq!(engine.on_bar(red(5)).signal, Signal::Hold);
        // Tick 7: continuation.
        let entry = engine.on_bar(green(6));
        assert_eq!(entry.signal, Signal::Buy);
        let Transition::Opened(trade) = entry.transition else {
            panic!("expected entry");
        };
        assert_eq!(trade.entry_index, 7);
        assert_eq!(trade.entry_htf_index, 1);
        assert_eq!(trade.entry_price, 101.0);

        let exit = engine.on_bar(red(7));
        assert_eq!(exit.signal, Signal::Sell);
        let Transition::Closed(record) = exit.transition else {
            panic!("expected exit");
        };
        assert_eq!(record.exit_index, 8);
        assert_eq!(record.exit_price, 100.0);
        assert_eq!(engine.stats().trades_closed, 1);
        assert!(!engine.is_position_open());
    }

    #[test]
    fn test_revert_failed_entry() {
        let mut engine = engine();
        for i in 0..HTF_BUCKET_SIZE {
            engine.on_bar(green(i));
        }
        engine.on_bar(red(5));
        let entry = engine.on_bar(green(6));
        assert!(engine.revert(&entry.transition));
        assert!(!engine.is_position_open());
    }

    #[test]
    fn test_force_close_uses_last_bar() {
        let mut engine = engine();
        assert!(engine.force_close().is_none());

        for i in 0..HTF_BUCKET_SIZE {
            engine.on_bar(green(i));
        }
        engine.on_bar(red(5));
        engine.on_bar(green(6));
        engine.on_bar(green(7));

        let record = engine.force_close().unwrap();
        assert_eq!(record.exit_index, 8);
        assert_eq!(record.exit_time, green(7).datetime());
        assert!(engine.force_close().is_none());
    }

    #[test]
    fn test_bounded_history_keeps_absolute_counters() {
        let config = EngineConfig {
            history_capacity: 2,
            ..Default::default()
        };
        let mut engine = MtfEngine::new(config).unwrap();
        for i in 0..23 {
            engine.on_bar(green(i));
        }

        assert_eq!(engine.ltf().len(), 2);
        assert_eq!(engine.htf().len(), 2);
        let stats = engine.stats();
        assert_eq!(stats.ticks, 23);
        assert_eq!(stats.htf_bars, 4);
        assert_eq!(stats.bucket_len, 3);
    }
}
