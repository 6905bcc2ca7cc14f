//! Backtest report generation.

use pullback_core::error::DataError;
use pullback_core::types::{OpenTrade, TradeRecord};
use pullback_data::CsvTradeLog;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::runner::{ReplayConfig, SignalEvent};
use crate::statistics::BacktestStats;

const RULE: &str = "═══════════════════════════════════════════════════════════\n";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────\n";

/// Complete backtest report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Configuration used
    pub config: ReplayConfig,
    /// Statistics
    pub stats: BacktestStats,
    /// Completed trades in exit order
    pub trades: Vec<TradeRecord>,
    /// BUY and SELL signals in tick order
    pub signals: Vec<SignalEvent>,
    /// Position left open when `close_open_position` is off
    pub open_position: Option<OpenTrade>,
}

impl BacktestReport {
    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str(RULE);
        s.push_str("                     BACKTEST REPORT                        \n");
        s.push_str(RULE);
        s.push('\n');

        s.push_str("DATA\n");
        s.push_str(THIN_RULE);
        s.push_str(&format!("  Symbol:              {}\n", self.config.engine.symbol));
        s.push_str(&format!("  LTF Bars Processed:  {}\n", self.stats.bars_processed));
        s.push_str(&format!("  HTF Bars Published:  {}\n", self.stats.htf_bars));
        s.push_str(&format!("  BUY Signals:         {}\n", self.stats.buy_signals));
        s.push_str(&format!("  SELL Signals:        {}\n", self.stats.sell_signals));
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str(THIN_RULE);
        s.push_str(&format!("  Total Trades:        {}\n", self.stats.total_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", self.stats.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", self.stats.losing_trades));
        s.push_str(&format!("  Breakeven Trades:    {}\n", self.stats.breakeven_trades));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", self.stats.win_rate_pct));
        s.push_str(&format!("  Total P&L:           {:.2}\n", self.stats.total_pnl));
        s.push_str(&format!("  Avg P&L:             {:.2} ({:.3}%)\n", self.stats.avg_pnl, self.stats.avg_pnl_pct));
        s.push_str(&format!("  Avg Win:             {:.2}\n", self.stats.avg_win));
        s.push_str(&format!("  Avg Loss:            {:.2}\n", self.stats.avg_loss));
        s.push_str(&format!("  Profit Factor:       {:.2}\n", self.stats.profit_factor));
        s.push_str(&format!("  Max Drawdown:        {:.2}\n", self.stats.max_drawdown));
        s.push_str(&format!("  Avg Bars Held:       {:.1}\n", self.stats.avg_bars_held));
        s.push('\n');

        if !self.trades.is_empty() {
            s.push_str("TRADES\n");
            s.push_str(THIN_RULE);
            for (i, t) in self.trades.iter().enumerate() {
                s.push_str(&format!("  #{} {} {}\n", i + 1, t.direction, t.symbol));
                s.push_str(&format!(
                    "    Entry: {}  @ {:.2}  candle {}  htf {}\n",
                    t.entry_time, t.entry_price, t.entry_index, t.entry_htf_index
                ));
                s.push_str(&format!(
                    "    Exit:  {}  @ {:.2}  candle {}  htf {}\n",
                    t.exit_time, t.exit_price, t.exit_index, t.exit_htf_index
                ));
                s.push_str(&format!("    P&L:   {:.2} ({:.3}%)\n", t.pnl(), t.pnl_pct()));
            }
            s.push('\n');
        }

        if let Some(open) = &self.open_position {
            s.push_str("OPEN POSITION\n");
            s.push_str(THIN_RULE);
            s.push_str(&format!(
                "  Entry: {}  @ {:.2}  candle {}  htf {}\n",
                open.entry_time, open.entry_price, open.entry_index, open.entry_htf_index
            ));
            s.push('\n');
        }

        s.push_str(RULE);

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the trades as a trade log.
    pub fn write_trades(&self, path: impl AsRef<Path>) -> Result<(), DataError> {
        CsvTradeLog::write_all(path, &self.trades)
    }
}
