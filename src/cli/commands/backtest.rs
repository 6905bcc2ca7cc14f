//! Backtest command implementation.

use anyhow::{Context, Result};
use pullback_backtest::{run_csv, ReplayConfig};
use pullback_config::AppConfig;
use std::path::PathBuf;
use tracing::info;

use super::engine_config;
use crate::cli::{BacktestArgs, OutputFormat};

pub async fn run(args: BacktestArgs, config: &AppConfig) -> Result<()> {
    let data_path = args
        .data
        .unwrap_or_else(|| PathBuf::from(&config.backtest.data_csv));
    if !data_path.exists() {
        anyhow::bail!(
            "Data file '{}' does not exist. Record one with `pullback live` or pass --data",
            data_path.display()
        );
    }
    info!(data = %data_path.display(), "Starting backtest");

    let replay_config = ReplayConfig {
        engine: engine_config(config),
        close_open_position: config.backtest.close_open_position && !args.keep_open,
    };
    let report = run_csv(replay_config, &data_path)
        .with_context(|| format!("Backtest of {} failed", data_path.display()))?;

    // Output results
    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    let trades_path = args
        .trades
        .unwrap_or_else(|| PathBuf::from(&config.backtest.trades_csv));
    report.write_trades(&trades_path)?;
    info!(trades = report.trades.len(), path = %trades_path.display(), "Trade log written");

    // Save if requested
    if let Some(save_path) = &args.save {
        std::fs::write(save_path, report.to_json()?)?;
        info!("Results saved to {:?}", save_path);
    }

    Ok(())
}
