//! Bar source trait definition.

use crate::error::DataError;
use crate::types::TimedBar;
use async_trait::async_trait;

/// Trait for real-time sources of closed bars.
///
/// Successive calls return bars in non-decreasing timestamp order. The same
/// bar may be returned more than once when the source is polled faster than
/// bars close; filtering repeats is the caller's job.
#[async_trait]
pub trait BarSource: Send + Sync {
    /// Fetch the most recent closed bar.
    async fn latest_closed_bar(&self) -> Result<TimedBar, DataError>;

    /// Get the data source name.
    fn name(&self) -> &str;
}
