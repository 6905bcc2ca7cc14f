//! Core types and traits for the pullback trading system.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, TimedBar)
//! - Signals, positions and completed trade records
//! - Order receipts returned by executors
//! - Collaborator traits for bar sources, order executors and sinks

pub mod types;
pub mod traits;
pub mod error;

pub use error::{TradingError, TradingResult};
pub use types::*;
pub use traits::*;
