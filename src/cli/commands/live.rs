//! Live trading command implementation.

use anyhow::{Context, Result};
use pullback_broker::{BinanceClient, BinanceConfig, PaperExecutor};
use pullback_config::AppConfig;
use pullback_core::traits::OrderExecutor;
use pullback_data::{CsvBarLog, CsvTradeLog};
use pullback_live::{LiveConfig, LiveTrader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::engine_config;
use crate::cli::LiveArgs;

pub async fn run(args: LiveArgs, config: &AppConfig) -> Result<()> {
    let dry_run = args.dry_run || config.live.dry_run;
    let exchange = &config.exchange;

    let mut binance = match BinanceConfig::from_env(&exchange.api_key_env, &exchange.api_secret_env)
    {
        Ok(binance) => binance,
        // Klines are public, so a dry run works without credentials.
        Err(e) if dry_run => {
            warn!(error = %e, "no API credentials, continuing with public endpoints only");
            BinanceConfig::new("", "")
        }
        Err(e) => {
            return Err(e).context("Live trading needs API credentials (see .env.example)")
        }
    };
    binance.testnet = exchange.testnet;
    binance.base_url = exchange.base_url.clone();
    binance.recv_window_ms = exchange.recv_window_ms;
    binance.symbol = config.market.symbol.clone();
    binance.base_asset = config.market.base_asset.clone();
    binance.interval = config.market.ltf;
    binance.quantity_precision = config.live.quantity_precision;

    info!(
        symbol = %binance.symbol,
        interval = %binance.interval,
        url = binance.base_url(),
        dry_run,
        "Starting live trading"
    );

    let client = Arc::new(BinanceClient::new(binance)?);
    let executor: Arc<dyn OrderExecutor> = if dry_run {
        Arc::new(PaperExecutor::new(&config.market.symbol))
    } else {
        client.clone()
    };

    let candles_path = args
        .candles
        .unwrap_or_else(|| PathBuf::from(&config.live.candles_csv));
    let trades_path = args
        .trades
        .unwrap_or_else(|| PathBuf::from(&config.live.trades_csv));
    let bar_sink = CsvBarLog::create(&candles_path)
        .with_context(|| format!("Failed to create {}", candles_path.display()))?;
    let trade_sink = CsvTradeLog::create(&trades_path)
        .with_context(|| format!("Failed to create {}", trades_path.display()))?;

    let live_config = LiveConfig {
        engine: engine_config(config),
        poll_interval: Duration::from_secs(config.live.poll_interval_secs),
        retry_delay: Duration::from_secs(config.live.retry_delay_secs),
        order_notional: config.live.order_notional,
    };
    let mut trader = LiveTrader::new(live_config, client, executor, bar_sink, trade_sink)?;

    info!("Press Ctrl+C to stop");
    let stats = trader.run(shutdown_signal()).await?;

    println!();
    println!("Session finished");
    println!("  Candles:         {}", stats.candles);
    println!("  HTF bars:        {}", stats.htf_bars);
    println!("  Trades:          {}", stats.trades);
    println!("  Duplicates:      {}", stats.duplicates);
    println!("  Unaligned:       {}", stats.discarded_unaligned);
    println!("  Orders:          {}", stats.orders);
    println!("  Order failures:  {}", stats.order_failures);
    println!("  Errors:          {}", stats.errors);
    println!("  Candle log:      {}", candles_path.display());
    println!("  Trade log:       {}", trades_path.display());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
