//! Backtest statistics.

use pullback_core::types::TradeRecord;
use serde::{Deserialize, Serialize};

/// Backtest statistics.
///
/// P&L figures are per unit of the traded asset, in quote currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestStats {
    /// Total number of trades
    pub total_trades: usize,
    /// Number of winning trades
    pub winning_trades: usize,
    /// Number of losing trades
    pub losing_trades: usize,
    /// Number of breakeven trades
    pub breakeven_trades: usize,
    /// Win rate percentage
    pub win_rate_pct: f64,
    /// Sum of trade P&L
    pub total_pnl: f64,
    /// Mean trade P&L
    pub avg_pnl: f64,
    /// Mean P&L percentage
    pub avg_pnl_pct: f64,
    /// Average profit per winning trade
    pub avg_win: f64,
    /// Average loss per losing trade
    pub avg_loss: f64,
    /// Profit factor (gross profit / gross loss)
    pub profit_factor: f64,
    /// Largest peak-to-trough drop of cumulative P&L
    pub max_drawdown: f64,
    /// Mean holding time in LTF bars
    pub avg_bars_held: f64,
    /// Number of LTF bars processed
    pub bars_processed: usize,
    /// Number of HTF bars published
    pub htf_bars: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
}

impl BacktestStats {
    /// Create an empty stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a completed trade.
    pub fn add_trade(&mut self, trade: &TradeRecord) {
        self.total_trades += 1;
        let pnl = trade.pnl();
        if pnl > 0.0 {
            self.winning_trades += 1;
        } else if pnl < 0.0 {
            self.losing_trades += 1;
        } else {
            self.breakeven_trades += 1;
        }
    }

    /// Calculate the derived statistics from the full trade list.
    pub fn finalize(&mut self, trades: &[TradeRecord]) {
        let mut gross_profit = 0.0;
        let mut gross_loss = 0.0;
        let mut equity = 0.0_f64;
        let mut peak = 0.0_f64;
        let mut pct_sum = 0.0;
        let mut bars_held = 0usize;

        for trade in trades {
            let pnl = trade.pnl();
            if pnl > 0.0 {
                gross_profit += pnl;
            } else {
                gross_loss += pnl.abs();
            }

            equity += pnl;
            peak = peak.max(equity);
            self.max_drawdown = self.max_drawdown.max(peak - equity);

            pct_sum += trade.pnl_pct();
            bars_held += trade.bars_held();
        }

        self.total_pnl = equity;

        if self.total_trades > 0 {
            let n = self.total_trades as f64;
            self.win_rate_pct = self.winning_trades as f64 * 100.0 / n;
            self.avg_pnl = self.total_pnl / n;
            self.avg_pnl_pct = pct_sum / n;
            self.avg_bars_held = bars_held as f64 / n;
        }

        if self.winning_trades > 0 {
            self.avg_win = gross_profit / self.winning_trades as f64;
        }
        if self.losing_trades > 0 {
            self.avg_loss = gross_loss / self.losing_trades as f64;
        }

        // Profit factor
        if gross_loss > 0.0 {
            self.profit_factor = gross_profit / gross_loss;
        }
    }

    /// Build stats for a finished trade list.
    pub fn from_trades(trades: &[TradeRecord]) -> Self {
        let mut stats = Self::new();
        for trade in trades {
            stats.add_trade(trade);
        }
        stats.finalize(trades);
        stats
    }
}
