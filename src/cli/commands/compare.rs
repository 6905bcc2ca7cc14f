//! Compare command implementation.

use anyhow::{Context, Result};
use pullback_config::AppConfig;
use pullback_data::{compare_trades, load_trades};
use std::path::PathBuf;

use crate::cli::CompareArgs;

pub async fn run(args: CompareArgs, config: &AppConfig) -> Result<()> {
    let live_path = args
        .live
        .unwrap_or_else(|| PathBuf::from(&config.live.trades_csv));
    let backtest_path = args
        .backtest
        .unwrap_or_else(|| PathBuf::from(&config.backtest.trades_csv));
    let max_diff = tolerance(args.max_diff_secs.unwrap_or(config.compare.max_time_diff_secs))?;

    let live = load_trades(&live_path)
        .with_context(|| format!("Failed to read {}", live_path.display()))?;
    let backtest = load_trades(&backtest_path)
        .with_context(|| format!("Failed to read {}", backtest_path.display()))?;

    println!("Live trades:     {}", live.len());
    println!("Backtest trades: {}", backtest.len());
    println!();

    let report = compare_trades(&live, &backtest, max_diff);
    println!("{}", report);

    if !report.is_match() {
        anyhow::bail!("live and backtest trades diverge");
    }
    Ok(())
}

/// Entry/exit time tolerance from a number of seconds.
fn tolerance(secs: i64) -> Result<chrono::Duration> {
    if secs < 0 {
        anyhow::bail!("max time difference must not be negative, got {}s", secs);
    }
    chrono::Duration::try_seconds(secs)
        .with_context(|| format!("max time difference of {}s is out of range", secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_accepts_zero_and_default() {
        assert_eq!(tolerance(0).unwrap(), chrono::Duration::zero());
        assert_eq!(tolerance(120).unwrap(), chrono::Duration::minutes(2));
    }

    #[test]
    fn test_tolerance_rejects_negative() {
        let err = tolerance(-1).unwrap_err();
        assert!(err.to_string().contains("must not be negative"));
    }

    #[test]
    fn test_tolerance_rejects_out_of_range() {
        let err = tolerance(i64::MAX).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
