//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pullback")]
#[command(author, version, about = "Multi-timeframe pullback trader with live/replay parity")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level (overrides logging.level)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a candle log through the engine
    Backtest(BacktestArgs),
    /// Start live trading
    Live(LiveArgs),
    /// Compare a live trade log against a backtest trade log
    Compare(CompareArgs),
    /// Validate configuration
    ValidateConfig,
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Candle CSV to replay (defaults to backtest.data_csv)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Trade log to write (defaults to backtest.trades_csv)
    #[arg(long)]
    pub trades: Option<PathBuf>,

    /// Leave a position open at the end of data instead of closing it
    #[arg(long)]
    pub keep_open: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Save the JSON report to file
    #[arg(long)]
    pub save: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct LiveArgs {
    /// Enable dry run (paper fills, no real orders)
    #[arg(long)]
    pub dry_run: bool,

    /// Trade log to write (defaults to live.trades_csv)
    #[arg(long)]
    pub trades: Option<PathBuf>,

    /// Candle log to write (defaults to live.candles_csv)
    #[arg(long)]
    pub candles: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct CompareArgs {
    /// Live trade log (defaults to live.trades_csv)
    #[arg(long)]
    pub live: Option<PathBuf>,

    /// Backtest trade log (defaults to backtest.trades_csv)
    #[arg(long)]
    pub backtest: Option<PathBuf>,

    /// Maximum entry/exit time difference in seconds
    #[arg(long)]
    pub max_diff_secs: Option<i64>,
}
