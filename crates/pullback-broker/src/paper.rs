//! Paper executor for dry runs and tests.

use async_trait::async_trait;
use chrono::Utc;
use pullback_core::error::BrokerError;
use pullback_core::traits::OrderExecutor;
use pullback_core::types::{OrderReceipt, Side};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Default)]
struct PaperState {
    /// Quote amount spent on the open position
    held: Option<Decimal>,
    orders: Vec<OrderReceipt>,
}

/// Fills every order immediately without touching an exchange.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone)]
pub struct PaperExecutor {
    symbol: String,
    state: Arc<Mutex<PaperState>>,
}

impl PaperExecutor {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            state: Arc::new(Mutex::new(PaperState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PaperState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn receipt(&self, side: Side, notional: Decimal) -> OrderReceipt {
        OrderReceipt {
            order_id: Uuid::new_v4().to_string(),
            symbol: self.symbol.clone(),
            side,
            quantity: None,
            notional: Some(notional),
            timestamp: Utc::now(),
        }
    }

    pub fn is_holding(&self) -> bool {
        self.lock().held.is_some()
    }

    /// All filled orders, oldest first.
    pub fn orders(&self) -> Vec<OrderReceipt> {
        self.lock().orders.clone()
    }
}

#[async_trait]
impl OrderExecutor for PaperExecutor {
    async fn open_position(&self, notional: Decimal) -> Result<OrderReceipt, BrokerError> {
        if notional <= Decimal::ZERO {
            return Err(BrokerError::OrderRejected(format!(
                "notional must be positive, got {}",
                notional
            )));
        }

        let mut state = self.lock();
        if state.held.is_some() {
            return Err(BrokerError::OrderRejected("position already open".into()));
        }

        let receipt = self.receipt(Side::Buy, notional);
        state.held = Some(notional);
        state.orders.push(receipt.clone());
        info!(order_id = %receipt.order_id, notional = %notional, "[PAPER] BUY filled");
        Ok(receipt)
    }

    async fn close_position(&self) -> Result<Option<OrderReceipt>, BrokerError> {
        let mut state = self.lock();
        let Some(notional) = state.held.take() else {
            return Ok(None);
        };

        let receipt = self.receipt(Side::Sell, notional);
        state.orders.push(receipt.clone());
        info!(order_id = %receipt.order_id, "[PAPER] SELL filled");
        Ok(Some(receipt))
    }

    fn name(&self) -> &str {
        "paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_open_then_close() {
        let paper = PaperExecutor::new("BTCUSDT");

        let buy = paper.open_position(dec!(100)).await.unwrap();
        assert_eq!(buy.side, Side::Buy);
        assert_eq!(buy.notional, Some(dec!(100)));
        assert!(paper.is_holding());

        let sell = paper.close_position().await.unwrap().unwrap();
        assert_eq!(sell.side, Side::Sell);
        assert_ne!(sell.order_id, buy.order_id);
        assert!(!paper.is_holding());
        assert_eq!(paper.orders().len(), 2);
    }

    #[tokio::test]
    async fn test_close_while_flat_is_noop() {
        let paper = PaperExecutor::new("BTCUSDT");
        assert!(paper.close_position().await.unwrap().is_none());
        assert!(paper.orders().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_double_open_and_bad_notional() {
        let paper = PaperExecutor::new("BTCUSDT");
        assert!(matches!(
            paper.open_position(Decimal::ZERO).await,
            Err(BrokerError::OrderRejected(_))
        ));

        paper.open_position(dec!(50)).await.unwrap();
        assert!(paper.open_position(dec!(50)).await.is_err());

        let shared = paper.clone();
        assert!(shared.is_holding());
    }
}
