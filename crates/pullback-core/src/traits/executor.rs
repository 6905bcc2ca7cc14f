//! Order executor trait definition.

use crate::error::BrokerError;
use crate::types::OrderReceipt;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Trait for order execution venues.
///
/// Executors place whole-position market orders for a single instrument.
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// Open a long position by spending `notional` units of the quote asset.
    async fn open_position(&self, notional: Decimal) -> Result<OrderReceipt, BrokerError>;

    /// Close the entire position.
    ///
    /// # Returns
    /// The sell receipt, or `None` when there was nothing to sell
    async fn close_position(&self) -> Result<Option<OrderReceipt>, BrokerError>;

    /// Get the executor name.
    fn name(&self) -> &str;
}
