//! The EVM sync engine: a reorg-safe, resumable, finality-aware downloader
//! and driver turning an EVM chain into an ordered stream of typed events
//! persisted by a per-syncer processor.

mod block;
pub use block::{EvmBlock, EvmBlockHeader, LogAppenderMap};

mod compatibility;
pub use compatibility::CompatibilityChecker;

mod downloader;
pub use downloader::{EvmDownloader, MAX_RETRY_COUNT_BLOCK_HASH_MISMATCH};

mod driver;
pub use driver::{EvmDriver, ReorgDetector, ReorgSubscription};

mod error;
pub use error::{AppendError, ProcessorError, SyncError};

mod metrics;
pub use metrics::DriverMetrics;

mod retry;
pub use retry::RetryHandler;

use aggkit_primitives::RuntimeData;

/// A processor persisting the ordered block stream of one syncer.
///
/// Within one driver, `process_block` calls happen in strictly increasing
/// block number and each call happens-before the next. After `reorg(n)`,
/// `get_last_processed_block` returns a number smaller than `n`.
#[async_trait::async_trait]
pub trait BlockProcessor: Send {
    /// The typed event union this processor consumes.
    type Event: Send + 'static;

    /// Atomically persists the block and all its events. A failure leaves no
    /// trace of the block, so a retry reproduces the same effect.
    async fn process_block(&mut self, block: EvmBlock<Self::Event>) -> Result<(), ProcessorError>;

    /// Atomically deletes everything persisted at or after the given block.
    async fn reorg(&mut self, first_reorged_block: u64) -> Result<(), ProcessorError>;

    /// Returns the highest processed block number, 0 for an empty store.
    async fn get_last_processed_block(&self) -> Result<u64, ProcessorError>;

    /// Returns the stored runtime identity.
    async fn get_runtime_data(&self) -> Result<Option<RuntimeData>, ProcessorError>;

    /// Persists the runtime identity.
    async fn set_runtime_data(&self, data: RuntimeData) -> Result<(), ProcessorError>;
}
