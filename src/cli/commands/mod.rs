//! CLI command implementations.

pub mod backtest;
pub mod compare;
pub mod live;
pub mod validate;

use pullback_config::AppConfig;
use pullback_engine::EngineConfig;

/// Engine settings shared by the live and replay drivers.
pub fn engine_config(config: &AppConfig) -> EngineConfig {
    EngineConfig {
        symbol: config.market.symbol.clone(),
        history_capacity: config.engine.history_capacity,
    }
}
