//! Syncs the L1 info tree and the rollup exit tree from the
//! `GlobalExitRootV2` and `RollupManager` contracts, serving inclusion
//! proofs and GER lookups to the rest of the node.

mod downloader;

mod event;
pub use event::{Event, InitL1InfoRootMap, UpdateL1InfoTree, UpdateL1InfoTreeV2, VerifyBatches};

mod processor;
pub use processor::L1InfoTreeProcessor;

use aggkit_client::EthClient;
use aggkit_db::Database;
use aggkit_migration::{L1InfoTreeMigrator, MigratorTrait};
use aggkit_primitives::BlockNumberFinality;
use aggkit_reorg_detector::ReorgDetector;
use aggkit_sync::{
    CompatibilityChecker, EvmDownloader, EvmDriver, ProcessorError, RetryHandler, SyncError,
};
use alloy_primitives::Address;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

const REORG_DETECTOR_ID: &str = "l1infotreesync";
const DOWNLOAD_BUFFER_SIZE: usize = 1000;

/// The error type of the L1 info tree syncer.
#[derive(Debug, thiserror::Error)]
pub enum L1InfoTreeError {
    /// An on-chain invariant was violated; the syncer is halted.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),
    /// The requested row is not indexed.
    #[error("l1infotreesync: not found")]
    NotFound,
    /// The queried block has not been processed yet.
    #[error("block {block_num} not processed yet, last processed: {last_processed}")]
    BlockNotProcessed {
        /// The queried block.
        block_num: u64,
        /// The highest processed block.
        last_processed: u64,
    },
    /// Network 0 is the mainnet and is not part of the rollup exit tree.
    #[error("network 0 is not a rollup")]
    InvalidRollupId,
    /// A database error occurred.
    #[error(transparent)]
    Database(#[from] aggkit_db::DatabaseError),
    /// A tree error occurred.
    #[error(transparent)]
    Tree(#[from] aggkit_tree::TreeError),
}

impl L1InfoTreeError {
    pub(crate) fn into_processor_error(self) -> ProcessorError {
        match self {
            Self::InconsistentState(reason) => ProcessorError::InconsistentState(reason),
            other => ProcessorError::Other(Box::new(other)),
        }
    }
}

/// The configuration of the L1 info tree syncer.
#[derive(Debug, Clone)]
pub struct L1InfoTreeSyncConfig {
    /// The path of the syncer database.
    pub db_path: String,
    /// The address of the `GlobalExitRootV2` contract.
    pub global_exit_root_addr: Address,
    /// The address of the `RollupManager` contract.
    pub rollup_manager_addr: Address,
    /// The size of a download chunk, in blocks.
    pub sync_block_chunk_size: u64,
    /// The finality blocks are queried with.
    pub block_finality: BlockNumberFinality,
    /// The tag blocks are considered final at.
    pub finalized_block_type: BlockNumberFinality,
    /// The poll period while waiting for new blocks.
    pub wait_for_new_blocks_period: Duration,
    /// The retry policy for transient errors.
    pub retry: RetryHandler,
    /// Whether a runtime-data mismatch refuses startup.
    pub require_storage_content_compatibility: bool,
}

/// Syncs the L1 info tree and the rollup exit tree.
#[derive(Debug)]
pub struct L1InfoTreeSync<C, R> {
    processor: L1InfoTreeProcessor,
    driver: EvmDriver<C, L1InfoTreeProcessor, R>,
}

impl<C, R> L1InfoTreeSync<C, R>
where
    C: EthClient + 'static,
    R: aggkit_sync::ReorgDetector,
{
    /// Creates the syncer: opens and migrates the database, loads the trees
    /// and wires the downloader and driver.
    pub async fn new(
        config: L1InfoTreeSyncConfig,
        client: Arc<C>,
        reorg_detector: Arc<R>,
    ) -> Result<Self, L1InfoTreeError> {
        let db = Database::new(&config.db_path).await?;
        L1InfoTreeMigrator::up(
            aggkit_db::DatabaseConnectionProvider::get_connection(&db),
            None,
        )
        .await
        .map_err(aggkit_db::DatabaseError::from)?;

        let processor = L1InfoTreeProcessor::new(db).await?;
        let downloader = EvmDownloader::new(
            REORG_DETECTOR_ID,
            client,
            config.sync_block_chunk_size,
            config.block_finality,
            config.wait_for_new_blocks_period,
            downloader::build_appenders(),
            vec![config.global_exit_root_addr, config.rollup_manager_addr],
            config.retry,
            config.finalized_block_type,
        );
        let driver = EvmDriver::new(
            reorg_detector,
            processor.clone(),
            downloader,
            REORG_DETECTOR_ID,
            DOWNLOAD_BUFFER_SIZE,
            config.retry,
            CompatibilityChecker::new(config.require_storage_content_compatibility),
        );

        Ok(Self { processor, driver })
    }

    /// A handle to the query surface, usable while the syncer runs.
    pub fn processor(&self) -> L1InfoTreeProcessor {
        self.processor.clone()
    }

    /// Runs the synchronization until cancelled or a fatal error occurs.
    pub async fn start(self, ct: CancellationToken) -> Result<(), SyncError> {
        self.driver.sync(ct).await
    }
}

/// A convenience alias for wiring against the concrete reorg detector.
pub type L1InfoTreeSyncWithDetector<C> = L1InfoTreeSync<C, ReorgDetector<C>>;
