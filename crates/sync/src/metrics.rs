use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// The metrics for the [`super::EvmDriver`].
#[derive(Metrics, Clone)]
#[metrics(scope = "evm_driver")]
pub struct DriverMetrics {
    /// A counter on the blocks handed to the processor.
    pub processed_blocks: Counter,
    /// A counter on the handled reorgs.
    pub reorgs: Counter,
    /// A histogram of the depth of handled reorgs.
    pub reorg_depths: Histogram,
}
