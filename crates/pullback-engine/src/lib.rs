//! Multi-timeframe aggregation and signal engine.
//!
//! One engine instance holds every piece of per-run state:
//! - LTF history of accepted bars
//! - HTF bucket aggregation with a one-tick publication delay
//! - Stateless pullback signal evaluation
//! - The flat/open position state machine
//!
//! Live and replay drivers both feed bars through [`MtfEngine::on_bar`], so
//! both see identical decisions for identical bar sequences.

mod aggregator;
mod alignment;
mod engine;
mod history;
mod position;
mod publication;
mod signal;

pub use aggregator::{HtfAggregator, HTF_BUCKET_SIZE};
pub use alignment::{AlignmentGate, AlignmentState};
pub use engine::{EngineConfig, EngineStats, MtfEngine, TickOutcome};
pub use history::History;
pub use position::{PositionState, PositionTracker, TickContext, Transition};
pub use publication::{GateStep, PublicationGate};
pub use signal::{has_minimum_data, PullbackSignal, MIN_HTF_BARS, MIN_LTF_BARS};
