//! Live driver.

use pullback_core::error::{TradingError, TradingResult};
use pullback_core::traits::{BarSink, BarSource, OrderExecutor, TradeSink};
use pullback_core::types::TimedBar;
use pullback_engine::{AlignmentGate, EngineConfig, MtfEngine, TickOutcome, Transition};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::duplicate::DuplicateFilter;

/// Live loop configuration.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub engine: EngineConfig,
    /// Sleep after every iteration
    pub poll_interval: Duration,
    /// Sleep after a failed iteration
    pub retry_delay: Duration,
    /// Quote amount spent per entry
    pub order_notional: Decimal,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            poll_interval: Duration::from_secs(30),
            retry_delay: Duration::from_secs(30),
            order_notional: Decimal::from(100),
        }
    }
}

/// What one poll did.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Bar already seen
    Duplicate,
    /// Bar dropped while waiting for the first HTF boundary
    Aligning { minute: u32 },
    /// Bar fed to the engine
    Tick(TickOutcome),
}

/// Session counters logged at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub candles: usize,
    pub htf_bars: usize,
    pub trades: usize,
    pub duplicates: usize,
    pub discarded_unaligned: usize,
    pub orders: usize,
    pub order_failures: usize,
    pub errors: usize,
}

/// Polls for bars and trades on the engine's transitions.
pub struct LiveTrader<B, T> {
    config: LiveConfig,
    source: Arc<dyn BarSource>,
    executor: Arc<dyn OrderExecutor>,
    engine: MtfEngine,
    alignment: AlignmentGate,
    duplicates: DuplicateFilter,
    bar_sink: B,
    trade_sink: T,
    stats: SessionStats,
}

impl<B: BarSink, T: TradeSink> LiveTrader<B, T> {
    pub fn new(
        config: LiveConfig,
        source: Arc<dyn BarSource>,
        executor: Arc<dyn OrderExecutor>,
        bar_sink: B,
        trade_sink: T,
    ) -> TradingResult<Self> {
        if config.order_notional <= Decimal::ZERO {
            return Err(TradingError::Config(format!(
                "order_notional must be positive, got {}",
                config.order_notional
            )));
        }
        let engine = MtfEngine::new(config.engine.clone())?;

        Ok(Self {
            config,
            source,
            executor,
            engine,
            alignment: AlignmentGate::new(),
            duplicates: DuplicateFilter::new(),
            bar_sink,
            trade_sink,
            stats: SessionStats::default(),
        })
    }

    /// Fetch the latest closed bar and process it if it is new.
    pub async fn poll_once(&mut self) -> TradingResult<PollOutcome> {
        let bar = self.source.latest_closed_bar().await?;

        if !self.duplicates.is_new(&bar) {
            self.stats.duplicates += 1;
            debug!(timestamp = %bar.datetime(), "bar already processed");
            return Ok(PollOutcome::Duplicate);
        }

        // An invalid bar must never arm the alignment gate.
        bar.validate()?;

        if !self.alignment.admit(&bar) {
            self.stats.discarded_unaligned += 1;
            info!(
                minute = bar.minute(),
                period = self.alignment.period(),
                "[ALIGNMENT] waiting for HTF boundary"
            );
            return Ok(PollOutcome::Aligning {
                minute: bar.minute(),
            });
        }
        if self.stats.candles == 0 {
            info!(at = %bar.datetime(), "[ALIGNMENT] aligned, starting strategy");
        }

        self.record_bar(&bar);

        let outcome = self.engine.on_bar(bar);
        self.stats.candles = outcome.index;
        self.stats.htf_bars = self.engine.stats().htf_bars;
        self.log_tick(&outcome);

        self.execute(&outcome).await?;
        Ok(PollOutcome::Tick(outcome))
    }

    fn record_bar(&mut self, bar: &TimedBar) {
        // The engine sees the bar either way; a gap in the candle log only
        // affects later verification.
        if let Err(e) = self.bar_sink.record(bar) {
            self.stats.errors += 1;
            error!(error = %e, timestamp = %bar.datetime(), "failed to record candle");
        }
    }

    fn log_tick(&self, outcome: &TickOutcome) {
        if let Some(htf) = &outcome.promoted {
            info!(
                htf = self.stats.htf_bars,
                open = htf.open,
                close = htf.close,
                color = htf.color(),
                "[HTF] published"
            );
        }
        info!(
            ltf = outcome.index,
            at = %outcome.datetime(),
            open = outcome.bar.open,
            close = outcome.bar.close,
            color = outcome.bar.color(),
            "[LTF] bar"
        );
        if outcome.completed.is_some() {
            debug!("[HTF] bucket complete, visible next bar");
        }
        if outcome.warming_up {
            info!(
                ltf = self.engine.ltf().len(),
                htf = self.engine.htf().len(),
                "[WAITING] need more data"
            );
        } else {
            let position = if self.engine.is_position_open() { "OPEN" } else { "FLAT" };
            info!(signal = %outcome.signal, position, "[SIGNAL]");
        }
    }

    /// Place the order for a transition, undoing the transition on failure.
    async fn execute(&mut self, outcome: &TickOutcome) -> TradingResult<()> {
        match &outcome.transition {
            Transition::None => Ok(()),
            Transition::Opened(open) => {
                info!(
                    candle = open.entry_index,
                    price = open.entry_price,
                    htf = open.entry_htf_index,
                    "[ENTRY]"
                );
                match self.executor.open_position(self.config.order_notional).await {
                    Ok(receipt) => {
                        self.stats.orders += 1;
                        info!(order_id = %receipt.order_id, executor = self.executor.name(), "BUY placed");
                        Ok(())
                    }
                    Err(e) => {
                        self.engine.revert(&outcome.transition);
                        self.stats.order_failures += 1;
                        error!(error = %e, "buy failed, staying flat");
                        Err(e.into())
                    }
                }
            }
            Transition::Closed(record) => {
                info!(
                    candle = record.exit_index,
                    price = record.exit_price,
                    htf = record.exit_htf_index,
                    pnl = record.pnl(),
                    pnl_pct = record.pnl_pct(),
                    "[EXIT]"
                );
                match self.executor.close_position().await {
                    Ok(Some(receipt)) => {
                        self.stats.orders += 1;
                        info!(order_id = %receipt.order_id, executor = self.executor.name(), "SELL placed");
                    }
                    Ok(None) => warn!("nothing to sell, treating position as closed"),
                    Err(e) => {
                        self.engine.revert(&outcome.transition);
                        self.stats.order_failures += 1;
                        error!(error = %e, "sell failed, position still open");
                        return Err(e.into());
                    }
                }

                self.stats.trades += 1;
                self.trade_sink.record(record)?;
                Ok(())
            }
        }
    }

    /// Poll until `shutdown` resolves, then shut down.
    ///
    /// The shutdown signal is checked between polls, never during one.
    pub async fn run<F>(&mut self, shutdown: F) -> TradingResult<SessionStats>
    where
        F: Future<Output = ()>,
    {
        info!(
            symbol = %self.config.engine.symbol,
            source = self.source.name(),
            executor = self.executor.name(),
            poll_secs = self.config.poll_interval.as_secs_f64(),
            "live trader started"
        );

        tokio::pin!(shutdown);
        loop {
            let delay = match self.poll_once().await {
                Ok(_) => self.config.poll_interval,
                Err(e) => {
                    self.stats.errors += 1;
                    error!(error = %e, "poll failed");
                    self.config.retry_delay
                }
            };

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.shutdown().await
    }

    /// Close any open position, flush the logs and report the session.
    pub async fn shutdown(&mut self) -> TradingResult<SessionStats> {
        info!("[SHUTDOWN] stopping trader");

        let mut first_error: Option<TradingError> = None;

        if let Some(record) = self.engine.force_close() {
            info!(entry = %record.entry_time, exit = %record.exit_time, "closing open position");
            match self.executor.close_position().await {
                Ok(_) => {
                    self.stats.trades += 1;
                    if let Err(e) = self.trade_sink.record(&record) {
                        self.stats.errors += 1;
                        error!(error = %e, "failed to record closing trade");
                        first_error = first_error.or(Some(e.into()));
                    }
                }
                Err(e) => {
                    self.stats.order_failures += 1;
                    error!(error = %e, "failed to close position on shutdown");
                }
            }
        }

        // Both sinks are flushed even after a failure.
        if let Err(e) = self.bar_sink.flush() {
            self.stats.errors += 1;
            error!(error = %e, "failed to flush candle log");
            first_error = first_error.or(Some(e.into()));
        }
        if let Err(e) = self.trade_sink.flush() {
            self.stats.errors += 1;
            error!(error = %e, "failed to flush trade log");
            first_error = first_error.or(Some(e.into()));
        }

        info!(
            candles = self.stats.candles,
            htf_bars = self.stats.htf_bars,
            trades = self.stats.trades,
            duplicates = self.stats.duplicates,
            discarded = self.stats.discarded_unaligned,
            order_failures = self.stats.order_failures,
            errors = self.stats.errors,
            "session statistics"
        );
        match first_error {
            Some(e) => Err(e),
            None => Ok(self.stats),
        }
    }

    pub fn engine(&self) -> &MtfEngine {
        &self.engine
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn is_aligned(&self) -> bool {
        self.alignment.is_aligned()
    }

    pub fn bar_sink(&self) -> &B {
        &self.bar_sink
    }

    pub fn trade_sink(&self) -> &T {
        &self.trade_sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pullback_core::error::{BrokerError, DataError};
    use pullback_core::types::{OrderReceipt, Side, TradeRecord};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// 2024-01-15 10:00:00 UTC
    const START: i64 = 1_705_312_800_000;

    fn bar(minute: i64, open: f64, close: f64) -> TimedBar {
        TimedBar::new(START + minute * 60_000, open, close)
    }

    /// Returns scripted bars, then notifies and errors once exhausted.
    struct ScriptedSource {
        bars: Mutex<VecDeque<TimedBar>>,
        exhausted: Arc<Notify>,
    }

    impl ScriptedSource {
        fn new(bars: Vec<TimedBar>) -> Self {
            Self {
                bars: Mutex::new(bars.into()),
                exhausted: Arc::new(Notify::new()),
            }
        }
    }

    #[async_trait]
    impl BarSource for ScriptedSource {
        async fn latest_closed_bar(&self) -> Result<TimedBar, DataError> {
            let next = self.bars.lock().unwrap().pop_front();
            match next {
                Some(bar) => Ok(bar),
                None => {
                    self.exhausted.notify_one();
                    Err(DataError::NoDataAvailable)
                }
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Counts orders; fails the first `fail_buys` buys.
    #[derive(Default)]
    struct CountingExecutor {
        buys: AtomicUsize,
        sells: AtomicUsize,
        fail_buys: AtomicUsize,
        fail_sells: AtomicUsize,
    }

    fn receipt(side: Side) -> OrderReceipt {
        OrderReceipt {
            order_id: "1".into(),
            symbol: "BTCUSDT".into(),
            side,
            quantity: None,
            notional: None,
            timestamp: chrono::Utc::now(),
        }
    }

    #[async_trait]
    impl OrderExecutor for CountingExecutor {
        async fn open_position(&self, _notional: Decimal) -> Result<OrderReceipt, BrokerError> {
            if self.fail_buys.load(Ordering::SeqCst) > 0 {
                self.fail_buys.fetch_sub(1, Ordering::SeqCst);
                return Err(BrokerError::NetworkError("timeout".into()));
            }
            self.buys.fetch_add(1, Ordering::SeqCst);
            Ok(receipt(Side::Buy))
        }

        async fn close_position(&self) -> Result<Option<OrderReceipt>, BrokerError> {
            if self.fail_sells.load(Ordering::SeqCst) > 0 {
                self.fail_sells.fetch_sub(1, Ordering::SeqCst);
                return Err(BrokerError::OrderRejected("insufficient balance".into()));
            }
            self.sells.fetch_add(1, Ordering::SeqCst);
            Ok(Some(receipt(Side::Sell)))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    /// Starts at :03, repeats a bar, then a green HTF bucket, red, green, red.
    fn session_bars() -> Vec<TimedBar> {
        vec![
            bar(3, 99.0, 98.0),
            bar(4, 98.0, 100.0),
            bar(5, 100.0, 101.0),
            bar(5, 100.0, 101.0),
            bar(6, 101.0, 102.0),
            bar(7, 102.0, 103.0),
            bar(8, 103.0, 104.0),
            bar(9, 104.0, 105.0),
            bar(10, 105.0, 104.0),
            bar(11, 104.0, 106.0),
            bar(11, 104.0, 106.0),
            bar(12, 106.0, 105.5),
        ]
    }

    type TestTrader = LiveTrader<Vec<TimedBar>, Vec<TradeRecord>>;

    fn trader(source: Arc<ScriptedSource>, executor: Arc<CountingExecutor>) -> TestTrader {
        let config = LiveConfig {
            poll_interval: Duration::from_millis(1),
            retry_delay: Duration::from_millis(1),
            ..Default::default()
        };
        LiveTrader::new(config, source, executor, Vec::new(), Vec::new()).unwrap()
    }

    async fn drain(trader: &mut TestTrader) -> Vec<PollOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = trader.poll_once().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    #[tokio::test]
    async fn test_alignment_and_duplicates() {
        let source = Arc::new(ScriptedSource::new(session_bars()));
        let mut trader = trader(source, Arc::new(CountingExecutor::default()));

        let outcomes = drain(&mut trader).await;
        assert_eq!(outcomes[0], PollOutcome::Aligning { minute: 3 });
        assert_eq!(outcomes[1], PollOutcome::Aligning { minute: 4 });
        assert!(matches!(outcomes[2], PollOutcome::Tick(ref t) if t.index == 1));
        assert_eq!(outcomes[3], PollOutcome::Duplicate);

        let stats = trader.stats();
        assert_eq!(stats.discarded_unaligned, 2);
        assert_eq!(stats.duplicates, 2);
        assert_eq!(stats.candles, 8);
        assert_eq!(trader.bar_sink().len(), 8);
        assert_eq!(trader.bar_sink()[0].minute(), 5);
    }

    #[tokio::test]
    async fn test_trade_is_executed_and_logged() {
        let source = Arc::new(ScriptedSource::new(session_bars()));
        let executor = Arc::new(CountingExecutor::default());
        let mut trader = trader(source, executor.clone());

        drain(&mut trader).await;

        assert_eq!(executor.buys.load(Ordering::SeqCst), 1);
        assert_eq!(executor.sells.load(Ordering::SeqCst), 1);
        let trades = trader.trade_sink();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_index, 7);
        assert_eq!(trades[0].exit_index, 8);
        assert_eq!(trades[0].entry_htf_index, 1);
    }

    #[tokio::test]
    async fn test_failed_buy_stays_flat() {
        let source = Arc::new(ScriptedSource::new(session_bars()));
        let executor = Arc::new(CountingExecutor::default());
        executor.fail_buys.store(1, Ordering::SeqCst);
        let mut trader = trader(source, executor.clone());

        // Run through the failing entry at the :11 bar.
        let mut results = Vec::new();
        for _ in 0..10 {
            results.push(trader.poll_once().await);
        }
        assert!(matches!(results[9], Err(TradingError::Broker(_))));
        assert!(!trader.engine().is_position_open());

        drain(&mut trader).await;
        assert!(trader.trade_sink().is_empty());
        assert_eq!(trader.stats().order_failures, 1);
        assert_eq!(executor.sells.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_sell_keeps_position() {
        let source = Arc::new(ScriptedSource::new(session_bars()));
        let executor = Arc::new(CountingExecutor::default());
        executor.fail_sells.store(1, Ordering::SeqCst);
        let mut trader = trader(source, executor.clone());

        drain(&mut trader).await;
        assert!(trader.engine().is_position_open());
        assert!(trader.trade_sink().is_empty());

        // The retry happens at shutdown.
        let stats = trader.shutdown().await.unwrap();
        assert_eq!(stats.trades, 1);
        assert_eq!(trader.trade_sink()[0].exit_index, 8);
        assert!(!trader.engine().is_position_open());
    }

    #[tokio::test]
    async fn test_run_until_shutdown_closes_position() {
        let mut bars = session_bars();
        bars.pop();
        let source = Arc::new(ScriptedSource::new(bars));
        let exhausted = source.exhausted.clone();
        let executor = Arc::new(CountingExecutor::default());
        let mut trader = trader(source, executor.clone());

        let stats = trader.run(async move { exhausted.notified().await }).await.unwrap();

        assert_eq!(stats.candles, 7);
        assert_eq!(stats.trades, 1);
        assert!(stats.errors >= 1);
        assert_eq!(executor.sells.load(Ordering::SeqCst), 1);
        let trade = &trader.trade_sink()[0];
        assert_eq!(trade.entry_index, 7);
        assert_eq!(trade.exit_index, 7);
    }

    #[tokio::test]
    async fn test_invalid_boundary_bar_does_not_align() {
        let mut bars = vec![bar(4, 99.0, 100.0), bar(5, f64::NAN, 101.0)];
        bars.extend((6..=15).map(|m| bar(m, 100.0, 101.0)));
        let polls = bars.len();
        let source = Arc::new(ScriptedSource::new(bars));
        let mut trader = trader(source, Arc::new(CountingExecutor::default()));

        let mut results = Vec::new();
        for _ in 0..polls {
            results.push(trader.poll_once().await);
        }
        assert!(matches!(
            results[1],
            Err(TradingError::Data(DataError::InvalidBar { .. }))
        ));
        assert!(trader.is_aligned());

        // :06 through :09 wait for the next boundary.
        assert_eq!(trader.stats().discarded_unaligned, 5);
        let candles = trader.bar_sink();
        assert_eq!(candles.len(), 6);
        assert_eq!(candles[0].minute(), 10);
        // :10-:14 form the first HTF bar, published on the :15 tick.
        let stats = trader.engine().stats();
        assert_eq!(stats.htf_bars, 1);
        assert_eq!(stats.bucket_len, 1);
    }

    /// Counts flushes; optionally fails every trade write.
    #[derive(Default)]
    struct FlakySink {
        fail_trades: bool,
        trades: usize,
        flushes: usize,
    }

    impl TradeSink for FlakySink {
        fn record(&mut self, _trade: &TradeRecord) -> Result<(), DataError> {
            if self.fail_trades {
                return Err(DataError::WriteError("disk full".into()));
            }
            self.trades += 1;
            Ok(())
        }

        fn flush(&mut self) -> Result<(), DataError> {
            self.flushes += 1;
            Ok(())
        }
    }

    impl BarSink for FlakySink {
        fn record(&mut self, _bar: &TimedBar) -> Result<(), DataError> {
            Ok(())
        }

        fn flush(&mut self) -> Result<(), DataError> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_shutdown_flushes_after_trade_write_failure() {
        let mut bars = session_bars();
        bars.pop();
        let source = Arc::new(ScriptedSource::new(bars));
        let executor = Arc::new(CountingExecutor::default());
        let config = LiveConfig {
            poll_interval: Duration::from_millis(1),
            retry_delay: Duration::from_millis(1),
            ..Default::default()
        };
        let trade_sink = FlakySink {
            fail_trades: true,
            ..Default::default()
        };
        let mut trader = LiveTrader::new(
            config,
            source,
            executor.clone(),
            FlakySink::default(),
            trade_sink,
        )
        .unwrap();

        while trader.poll_once().await.is_ok() {}
        assert!(trader.engine().is_position_open());

        let result = trader.shutdown().await;
        assert!(matches!(
            result,
            Err(TradingError::Data(DataError::WriteError(_)))
        ));
        assert_eq!(executor.sells.load(Ordering::SeqCst), 1);
        assert!(!trader.engine().is_position_open());
        assert_eq!(trader.bar_sink().flushes, 1);
        assert_eq!(trader.trade_sink().flushes, 1);
        assert_eq!(trader.trade_sink().trades, 0);
        assert_eq!(trader.stats().errors, 1);
    }

    #[test]
    fn test_rejects_non_positive_notional() {
        let config = LiveConfig {
            order_notional: Decimal::ZERO,
            ..Default::default()
        };
        let result = LiveTrader::new(
            config,
            Arc::new(ScriptedSource::new(Vec::new())),
            Arc::new(CountingExecutor::default()),
            Vec::<TimedBar>::new(),
            Vec::<TradeRecord>::new(),
        );
        assert!(matches!(result, Err(TradingError::Config(_))));
    }
}
