//! Order execution venues and the live bar feed.
//!
//! [`BinanceClient`] talks to the Binance spot REST API and serves as both
//! the live [`BarSource`](pullback_core::traits::BarSource) and the live
//! [`OrderExecutor`](pullback_core::traits::OrderExecutor).
//! [`PaperExecutor`] fills orders in memory for dry runs.

mod binance;
mod paper;

pub use binance::{sign_query, BinanceClient, BinanceConfig, LIVE_URL, TESTNET_URL};
pub use paper::PaperExecutor;
