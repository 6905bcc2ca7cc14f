//! Configuration structures.

use pullback_core::error::{TradingError, TradingResult};
use pullback_core::types::Timeframe;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub exchange: ExchangeSettings,
    #[serde(default)]
    pub market: MarketSettings,
    #[serde(default)]
    pub live: LiveSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub backtest: BacktestSettings,
    #[serde(default)]
    pub compare: CompareSettings,
}

impl AppConfig {
    /// Check values the types alone do not rule out.
    pub fn validate(&self) -> TradingResult<()> {
        let fail = |msg: String| -> TradingResult<()> { Err(TradingError::Config(msg)) };

        if self.market.symbol.trim().is_empty() {
            return fail("market.symbol must not be empty".into());
        }
        if self.market.base_asset.trim().is_empty() {
            return fail("market.base_asset must not be empty".into());
        }
        if !self.market.symbol.starts_with(&self.market.base_asset) {
            return fail(format!(
                "market.base_asset {} is not the base of {}",
                self.market.base_asset, self.market.symbol
            ));
        }
        if self.live.poll_interval_secs == 0 {
            return fail("live.poll_interval_secs must be positive".into());
        }
        if self.live.retry_delay_secs == 0 {
            return fail("live.retry_delay_secs must be positive".into());
        }
        if self.live.order_notional <= Decimal::ZERO {
            return fail(format!(
                "live.order_notional must be positive, got {}",
                self.live.order_notional
            ));
        }
        if self.engine.history_capacity == 1 {
            return fail("engine.history_capacity must be 0 (unbounded) or at least 2".into());
        }
        if self.compare.max_time_diff_secs < 0 {
            return fail("compare.max_time_diff_secs must not be negative".into());
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return fail(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            ));
        }
        Ok(())
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "pullback".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
    /// Also write logs to this file
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Exchange API configuration.
///
/// Credentials are never stored here, only the names of the environment
/// variables holding them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeSettings {
    pub api_key_env: String,
    pub api_secret_env: String,
    pub testnet: bool,
    pub base_url: Option<String>,
    pub recv_window_ms: u64,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            api_key_env: "BINANCE_API_KEY".to_string(),
            api_secret_env: "BINANCE_API_SECRET".to_string(),
            testnet: true,
            base_url: None,
            recv_window_ms: 5000,
        }
    }
}

/// Instrument and bar interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    pub symbol: String,
    pub base_asset: String,
    pub ltf: Timeframe,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            base_asset: "BTC".to_string(),
            ltf: Timeframe::Minute1,
        }
    }
}

/// Live loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    pub poll_interval_secs: u64,
    pub retry_delay_secs: u64,
    /// Quote amount spent per entry
    pub order_notional: Decimal,
    /// Decimals kept on sell quantities
    pub quantity_precision: u32,
    /// Fill orders in memory instead of on the exchange
    pub dry_run: bool,
    pub trades_csv: String,
    pub candles_csv: String,
}

impl Default for LiveSettings {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            poll_interval_secs: 30,
            retry_delay_secs: 30,
            order_notional: dec!(100),
            quantity_precision: 6,
            dry_run: false,
            trades_csv: "live_trades.csv".to_string(),
            candles_csv: "live_candles.csv".to_string(),
        }
    }
}

/// Engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Bars retained per history (0 = unbounded)
    pub history_capacity: usize,
}

/// Backtest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub data_csv: String,
    pub trades_csv: String,
    pub close_open_position: bool,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            data_csv: "live_candles.csv".to_string(),
            trades_csv: "backtest_trades.csv".to_string(),
            close_open_position: true,
        }
    }
}

/// Trade comparison settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareSettings {
    pub max_time_diff_secs: i64,
}

impl Default for CompareSettings {
    fn default() -> Self {
        Self {
            max_time_diff_secs: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.market.ltf, Timeframe::Minute1);
        assert!(config.exchange.testnet);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.engine.history_capacity = 1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.live.order_notional = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.market.base_asset = "ETH".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[live]"));
        assert!(text.contains("ltf = \"1m\""));

        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.live.order_notional, config.live.order_notional);
        assert_eq!(parsed.market.symbol, config.market.symbol);
    }
}
