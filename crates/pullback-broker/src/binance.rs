//! Binance spot REST client used for live trading.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use pullback_core::error::{BrokerError, DataError};
use pullback_core::traits::{BarSource, OrderExecutor};
use pullback_core::types::{OrderReceipt, Side, TimedBar, Timeframe};
use reqwest::{header, Client, Response, StatusCode};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

pub const LIVE_URL: &str = "https://api.binance.com";
pub const TESTNET_URL: &str = "https://testnet.binance.vision";

/// Binance API configuration.
#[derive(Clone)]
pub struct BinanceConfig {
    pub api_key: String,
    pub api_secret: String,
    pub testnet: bool,
    /// Overrides the testnet/live URL when set
    pub base_url: Option<String>,
    pub symbol: String,
    /// Asset sold when closing, e.g. `BTC` for `BTCUSDT`
    pub base_asset: String,
    pub interval: Timeframe,
    pub recv_window_ms: u64,
    /// Decimals kept on sell quantities
    pub quantity_precision: u32,
}

impl BinanceConfig {
    /// Create a testnet config for `BTCUSDT` 1m with the given credentials.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            testnet: true,
            base_url: None,
            symbol: "BTCUSDT".to_string(),
            base_asset: "BTC".to_string(),
            interval: Timeframe::Minute1,
            recv_window_ms: 5000,
            quantity_precision: 6,
        }
    }

    /// Read credentials from the named environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env(key_var: &str, secret_var: &str) -> Result<Self, BrokerError> {
        let _ = dotenvy::dotenv();

        let api_key = std::env::var(key_var)
            .map_err(|_| BrokerError::Configuration(format!("{} not set", key_var)))?;
        let api_secret = std::env::var(secret_var)
            .map_err(|_| BrokerError::Configuration(format!("{} not set", secret_var)))?;

        Ok(Self::new(api_key, api_secret))
    }

    pub fn base_url(&self) -> &str {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/'),
            None if self.testnet => TESTNET_URL,
            None => LIVE_URL,
        }
    }
}

impl fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceConfig")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .field("testnet", &self.testnet)
            .field("base_url", &self.base_url())
            .field("symbol", &self.symbol)
            .field("base_asset", &self.base_asset)
            .field("interval", &self.interval)
            .field("recv_window_ms", &self.recv_window_ms)
            .field("quantity_precision", &self.quantity_precision)
            .finish()
    }
}

/// HMAC-SHA256 signature of a query string, hex encoded.
pub fn sign_query(secret: &str, query: &str) -> Result<String, BrokerError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BrokerError::Configuration(format!("invalid API secret: {}", e)))?;
    mac.update(query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    free: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: u64,
    #[serde(default)]
    executed_qty: Option<String>,
    #[serde(default)]
    cummulative_quote_qty: Option<String>,
    #[serde(default)]
    transact_time: Option<i64>,
}

/// Pick the last closed kline from a `limit=2` klines response.
///
/// The final row is the kline still forming.
fn parse_closed_kline(rows: &[Vec<Value>]) -> Result<TimedBar, DataError> {
    if rows.len() < 2 {
        return Err(DataError::NoDataAvailable);
    }
    let row = &rows[rows.len() - 2];

    let open_time = row
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| DataError::ParseError("kline open time missing".into()))?;
    let price = |i: usize, name: &str| -> Result<f64, DataError> {
        row.get(i)
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| DataError::ParseError(format!("kline {} missing", name)))
    };

    Ok(TimedBar::new(open_time, price(1, "open")?, price(4, "close")?))
}

fn free_balance(account: &AccountInfo, asset: &str) -> Result<Decimal, BrokerError> {
    match account.balances.iter().find(|b| b.asset == asset) {
        Some(balance) => Decimal::from_str(&balance.free)
            .map_err(|e| BrokerError::ApiError(format!("bad {} balance: {}", asset, e))),
        None => Ok(Decimal::ZERO),
    }
}

/// Sell quantity for a free balance, rounded toward zero.
fn sell_quantity(free: Decimal, precision: u32) -> Decimal {
    free.round_dp_with_strategy(precision, RoundingStrategy::ToZero)
        .normalize()
}

/// Binance spot client.
pub struct BinanceClient {
    config: BinanceConfig,
    client: Client,
}

impl BinanceClient {
    /// Create a new client.
    pub fn new(config: BinanceConfig) -> Result<Self, BrokerError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "X-MBX-APIKEY",
            header::HeaderValue::from_str(&config.api_key)
                .map_err(|e| BrokerError::Configuration(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        info!(
            base_url = config.base_url(),
            symbol = %config.symbol,
            testnet = config.testnet,
            "binance client ready"
        );

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BinanceConfig {
        &self.config
    }

    /// Append `recvWindow`, `timestamp` and `signature` to a query string.
    fn signed_query(&self, params: &str) -> Result<String, BrokerError> {
        let mut query = String::from(params);
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!(
            "recvWindow={}&timestamp={}",
            self.config.recv_window_ms,
            Utc::now().timestamp_millis()
        ));
        let signature = sign_query(&self.config.api_secret, &query)?;
        Ok(format!("{}&signature={}", query, signature))
    }

    async fn check(resp: Response) -> Result<Response, BrokerError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
            let retry_after_secs = resp
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(BrokerError::RateLimited { retry_after_secs });
        }

        let text = resp.text().await.unwrap_or_default();
        let err = match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(body) => match body.code {
                -2014 | -2015 | -1022 => BrokerError::AuthenticationError(body.msg),
                -2010 | -1013 => BrokerError::OrderRejected(body.msg),
                code => BrokerError::ApiError(format!("{} ({}): {}", status, code, body.msg)),
            },
            Err(_) if status == StatusCode::UNAUTHORIZED => BrokerError::AuthenticationError(text),
            Err(_) => BrokerError::ApiError(format!("{}: {}", status, text)),
        };
        Err(err)
    }

    async fn signed_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &str,
    ) -> Result<T, BrokerError> {
        let url = format!("{}{}?{}", self.config.base_url(), path, self.signed_query(params)?);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BrokerError::NetworkError(e.to_string()))?;

        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| BrokerError::ApiError(e.to_string()))
    }

    async fn market_order(&self, side: Side, sizing: &str) -> Result<OrderResponse, BrokerError> {
        let params = format!(
            "symbol={}&side={}&type=MARKET&{}",
            self.config.symbol,
            side.as_str(),
            sizing
        );
        let url = format!(
            "{}/api/v3/order?{}",
            self.config.base_url(),
            self.signed_query(&params)?
        );
        debug!(side = %side, sizing, "submitting market order");

        let resp = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| BrokerError::NetworkError(e.to_string()))?;

        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| BrokerError::ApiError(e.to_string()))
    }

    /// Free balance of the configured base asset.
    pub async fn base_balance(&self) -> Result<Decimal, BrokerError> {
        let account: AccountInfo = self.signed_get("/api/v3/account", "").await?;
        free_balance(&account, &self.config.base_asset)
    }

    fn receipt(&self, side: Side, order: OrderResponse) -> OrderReceipt {
        let parse = |v: Option<String>| v.and_then(|s| Decimal::from_str(&s).ok());
        OrderReceipt {
            order_id: order.order_id.to_string(),
            symbol: self.config.symbol.clone(),
            side,
            quantity: parse(order.executed_qty),
            notional: parse(order.cummulative_quote_qty),
            timestamp: order
                .transact_time
                .and_then(DateTime::from_timestamp_millis)
                .unwrap_or_else(Utc::now),
        }
    }
}

#[async_trait]
impl BarSource for BinanceClient {
    async fn latest_closed_bar(&self) -> Result<TimedBar, DataError> {
        let url = format!("{}/api/v3/klines", self.config.base_url());
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("symbol", self.config.symbol.as_str()),
                ("interval", self.config.interval.as_interval()),
                ("limit", "2"),
            ])
            .send()
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        let rows: Vec<Vec<Value>> = Self::check(resp)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?
            .json()
            .await
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        parse_closed_kline(&rows)
    }

    fn name(&self) -> &str {
        "binance"
    }
}

#[async_trait]
impl OrderExecutor for BinanceClient {
    async fn open_position(&self, notional: Decimal) -> Result<OrderReceipt, BrokerError> {
        let order = self
            .market_order(Side::Buy, &format!("quoteOrderQty={}", notional.normalize()))
            .await?;
        info!(order_id = order.order_id, notional = %notional, "BUY executed");
        Ok(self.receipt(Side::Buy, order))
    }

    async fn close_position(&self) -> Result<Option<OrderReceipt>, BrokerError> {
        let free = self.base_balance().await?;
        let quantity = sell_quantity(free, self.config.quantity_precision);
        if quantity.is_zero() {
            warn!(asset = %self.config.base_asset, free = %free, "no balance to sell");
            return Ok(None);
        }

        let order = self
            .market_order(Side::Sell, &format!("quantity={}", quantity))
            .await?;
        info!(order_id = order.order_id, quantity = %quantity, "SELL executed");
        Ok(Some(self.receipt(Side::Sell, order)))
    }

    fn name(&self) -> &str {
        "binance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sign_query() {
        // Worked example from the Binance API documentation.
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign_query(secret, query).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_parse_closed_kline_uses_second_to_last() {
        let body = r#"[
            [1705314900000, "42000.10", "42010.00", "41990.00", "42005.50", "12.5", 1705314959999, "0", 10, "0", "0", "0"],
            [1705314960000, "42005.50", "42020.00", "42000.00", "42015.00", "3.1", 1705315019999, "0", 4, "0", "0", "0"]
        ]"#;
        let rows: Vec<Vec<Value>> = serde_json::from_str(body).unwrap();
        let bar = parse_closed_kline(&rows).unwrap();

        assert_eq!(bar.timestamp, 1_705_314_900_000);
        assert_eq!(bar.bar.open, 42000.10);
        assert_eq!(bar.bar.close, 42005.50);
    }

    #[test]
    fn test_parse_closed_kline_errors() {
        let one: Vec<Vec<Value>> =
            serde_json::from_str(r#"[[1705314900000, "1", "1", "1", "1"]]"#).unwrap();
        assert!(matches!(parse_closed_kline(&one), Err(DataError::NoDataAvailable)));

        let bad: Vec<Vec<Value>> =
            serde_json::from_str(r#"[[1705314900000, "x", "1", "1", "1"], [0]]"#).unwrap();
        assert!(matches!(parse_closed_kline(&bad), Err(DataError::ParseError(_))));
    }

    #[test]
    fn test_free_balance_and_rounding() {
        let account: AccountInfo = serde_json::from_str(
            r#"{"balances":[{"asset":"USDT","free":"900.0","locked":"0"},{"asset":"BTC","free":"0.0023789","locked":"0"}]}"#,
        )
        .unwrap();

        let btc = free_balance(&account, "BTC").unwrap();
        assert_eq!(btc, dec!(0.0023789));
        assert_eq!(sell_quantity(btc, 6), dec!(0.002378));
        assert_eq!(free_balance(&account, "ETH").unwrap(), Decimal::ZERO);
        assert!(sell_quantity(dec!(0.0000009), 6).is_zero());
    }

    #[test]
    fn test_base_url() {
        let mut config = BinanceConfig::new("key-value", "secret-value");
        assert_eq!(config.base_url(), TESTNET_URL);
        config.testnet = false;
        assert_eq!(config.base_url(), LIVE_URL);
        config.base_url = Some("http://localhost:8080/".into());
        assert_eq!(config.base_url(), "http://localhost:8080");
        assert!(!format!("{:?}", config).contains("secret-value"));
    }
}
