//! Replay driver.

use chrono::{DateTime, Utc};
use pullback_core::error::{DataError, TradingResult};
use pullback_core::types::{Signal, TimedBar, TradeRecord};
use pullback_engine::{AlignmentGate, EngineConfig, MtfEngine, Transition};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::report::BacktestReport;
use crate::statistics::BacktestStats;

/// Replay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    pub engine: EngineConfig,
    /// Close a still-open position at the last bar
    pub close_open_position: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            close_open_position: true,
        }
    }
}

/// An actionable signal produced during replay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub index: usize,
    pub time: DateTime<Utc>,
    pub price: f64,
    pub signal: Signal,
}

/// Drives a recorded bar sequence through one engine instance.
pub struct ReplayRunner {
    config: ReplayConfig,
}

impl ReplayRunner {
    /// Create a new replay runner.
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Replay `bars` in order.
    ///
    /// Bars are assumed aligned; a misaligned first bar only logs a warning.
    /// An invalid bar aborts the run.
    pub fn run(&self, bars: &[TimedBar]) -> TradingResult<BacktestReport> {
        let mut engine = MtfEngine::new(self.config.engine.clone())?;

        if let Some(first) = bars.first() {
            let gate = AlignmentGate::new();
            if !gate.is_boundary(first) {
                warn!(
                    first_bar = %first.datetime(),
                    period = gate.period(),
                    "replay data does not start on an HTF boundary, proceeding"
                );
            }
        }

        info!(bars = bars.len(), symbol = %self.config.engine.symbol, "starting replay");

        let mut trades: Vec<TradeRecord> = Vec::new();
        let mut signals = Vec::new();

        for bar in bars {
            bar.validate()?;

            let outcome = engine.on_bar(*bar);
            if outcome.signal.is_actionable() {
                signals.push(SignalEvent {
                    index: outcome.index,
                    time: outcome.datetime(),
                    price: outcome.bar.close,
                    signal: outcome.signal,
                });
            }

            match outcome.transition {
                Transition::Opened(open) => {
                    debug!(index = open.entry_index, price = open.entry_price, "entry");
                }
                Transition::Closed(record) => {
                    debug!(index = record.exit_index, pnl = record.pnl(), "exit");
                    trades.push(record);
                }
                Transition::None => {}
            }
        }

        let mut open_position = None;
        if self.config.close_open_position {
            if let Some(record) = engine.force_close() {
                info!(exit = %record.exit_time, "closing open position at end of data");
                trades.push(record);
            }
        } else {
            open_position = engine.open_trade().cloned();
        }

        let stats = engine.stats();
        let mut report_stats = BacktestStats::from_trades(&trades);
        report_stats.bars_processed = stats.ticks;
        report_stats.htf_bars = stats.htf_bars;
        report_stats.buy_signals = signals.iter().filter(|s| s.signal == Signal::Buy).count();
        report_stats.sell_signals = signals.iter().filter(|s| s.signal == Signal::Sell).count();

        info!(
            trades = trades.len(),
            bars = stats.ticks,
            htf_bars = stats.htf_bars,
            "replay complete"
        );

        Ok(BacktestReport {
            config: self.config.clone(),
            stats: report_stats,
            trades,
            signals,
            open_position,
        })
    }
}

/// Replay a candle file.
pub fn run_csv(
    config: ReplayConfig,
    path: impl AsRef<std::path::Path>,
) -> TradingResult<BacktestReport> {
    let bars = pullback_data::load_csv(path)?;
    if bars.is_empty() {
        return Err(DataError::NoDataAvailable.into());
    }
    ReplayRunner::new(config).run(&bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pullback_core::error::TradingError;

    /// 2024-01-15 10:00:00 UTC
    const START: i64 = 1_705_312_800_000;

    fn bars(prices: &[(f64, f64)]) -> Vec<TimedBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &(o, c))| TimedBar::new(START + i as i64 * 60_000, o, c))
            .collect()
    }

    /// Five green bars (one green HTF bar), then red, green, red.
    fn pullback_sequence() -> Vec<TimedBar> {
        bars(&[
            (100.0, 101.0),
            (101.0, 102.0),
            (102.0, 103.0),
            (103.0, 104.0),
            (104.0, 105.0),
            (105.0, 104.0),
            (104.0, 106.0),
            (106.0, 105.5),
        ])
    }

    #[test]
    fn test_replay_produces_trade() {
        let report = ReplayRunner::new(ReplayConfig::default())
            .run(&pullback_sequence())
            .unwrap();

        assert_eq!(report.trades.len(), 1);
        let trade = &report.trades[0];
        assert_eq!(trade.entry_index, 7);
        assert_eq!(trade.entry_price, 106.0);
        assert_eq!(trade.exit_index, 8);
        assert_eq!(trade.exit_price, 105.5);
        assert_eq!(report.stats.bars_processed, 8);
        assert_eq!(report.stats.htf_bars, 1);
        assert_eq!(report.stats.buy_signals, 1);
        assert_eq!(report.stats.sell_signals, 1);
    }

    #[test]
    fn test_open_position_at_end() {
        let all = pullback_sequence();
        let data = &all[..7];

        let closed = ReplayRunner::new(ReplayConfig::default()).run(data).unwrap();
        assert_eq!(closed.trades.len(), 1);
        assert_eq!(closed.trades[0].exit_index, 7);
        assert!(closed.open_position.is_none());

        let config = ReplayConfig {
            close_open_position: false,
            ..Default::default()
        };
        let open = ReplayRunner::new(config).run(data).unwrap();
        assert!(open.trades.is_empty());
        assert_eq!(open.open_position.map(|t| t.entry_index), Some(7));
    }

    #[test]
    fn test_invalid_bar_aborts() {
        let mut data = pullback_sequence();
        data[3] = TimedBar::new(data[3].timestamp, f64::NAN, 1.0);

        let result = ReplayRunner::new(ReplayConfig::default()).run(&data);
        assert!(matches!(
            result,
            Err(TradingError::Data(DataError::InvalidBar { .. }))
        ));
    }

    #[test]
    fn test_misaligned_data_is_still_replayed() {
        let data: Vec<TimedBar> = pullback_sequence()
            .into_iter()
            .map(|b| TimedBar::new(b.timestamp + 120_000, b.bar.open, b.bar.close))
            .collect();

        let report = ReplayRunner::new(ReplayConfig::default()).run(&data).unwrap();
        assert_eq!(report.stats.bars_processed, 8);
        assert_eq!(report.trades.len(), 1);
    }

    #[test]
    fn test_run_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candles.csv");
        let mut csv = String::from("timestamp,open,close\n");
        for bar in pullback_sequence() {
            csv.push_str(&format!("{},{},{}\n", bar.timestamp, bar.bar.open, bar.bar.close));
        }
        std::fs::write(&path, csv).unwrap();

        let report = run_csv(ReplayConfig::default(), &path).unwrap();
        assert_eq!(report.trades.len(), 1);

        std::fs::write(&path, "timestamp,open,close\n").unwrap();
        assert!(run_csv(ReplayConfig::default(), &path).is_err());
    }
}
