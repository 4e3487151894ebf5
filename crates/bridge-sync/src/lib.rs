//! Syncs bridge, claim, token-mapping and legacy-migration events from a
//! bridge contract (on L1 or L2) and maintains the corresponding local exit
//! tree.

mod downloader;
pub use downloader::claim_calldata;

mod event;
pub use event::Event;

mod processor;
pub use processor::BridgeProcessor;

use aggkit_client::EthClient;
use aggkit_db::Database;
use aggkit_migration::{BridgeMigrator, MigratorTrait};
use aggkit_primitives::BlockNumberFinality;
use aggkit_sync::{
    CompatibilityChecker, EvmDownloader, EvmDriver, RetryHandler, SyncError,
};
use alloy_primitives::Address;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

const DOWNLOAD_BUFFER_SIZE: usize = 1000;

/// The error type of a bridge syncer.
#[derive(Debug, thiserror::Error)]
pub enum BridgeSyncError {
    /// The requested row is not indexed.
    #[error("bridgesync: not found")]
    NotFound,
    /// A database error occurred.
    #[error(transparent)]
    Database(#[from] aggkit_db::DatabaseError),
    /// A tree error occurred.
    #[error(transparent)]
    Tree(#[from] aggkit_tree::TreeError),
}

/// The configuration of a bridge syncer.
#[derive(Debug, Clone)]
pub struct BridgeSyncConfig {
    /// The syncer id, also used as the reorg-detector subscriber id
    /// (`bridgel1sync` or `bridgel2sync`).
    pub syncer_id: String,
    /// The path of the syncer database.
    pub db_path: String,
    /// The address of the bridge contract.
    pub bridge_addr: Address,
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

/// Syncs a bridge contract into the local database and exit tree.
#[derive(Debug)]
pub struct BridgeSync<C, R> {
    processor: BridgeProcessor,
    driver: EvmDriver<C, BridgeProcessor, R>,
}

impl<C, R> BridgeSync<C, R>
where
    C: EthClient + 'static,
    R: aggkit_sync::ReorgDetector,
{
    /// Creates the syncer: opens and migrates the database, loads the local
    /// exit tree and wires the downloader and driver.
    pub async fn new(
        config: BridgeSyncConfig,
        client: Arc<C>,
        reorg_detector: Arc<R>,
    ) -> Result<Self, BridgeSyncError> {
        let db = Database::new(&config.db_path).await?;
        BridgeMigrator::up(aggkit_db::DatabaseConnectionProvider::get_connection(&db), None)
            .await
            .map_err(aggkit_db::DatabaseError::from)?;

        let processor = BridgeProcessor::new(db).await?;
        let downloader = EvmDownloader::new(
            config.syncer_id.clone(),
            client,
            config.sync_block_chunk_size,
            config.block_finality,
            config.wait_for_new_blocks_period,
            downloader::build_appenders(),
            vec![config.bridge_addr],
            config.retry,
            config.finalized_block_type,
        );
        let driver = EvmDriver::new(
            reorg_detector,
            processor.clone(),
            downloader,
            config.syncer_id,
            DOWNLOAD_BUFFER_SIZE,
            config.retry,
            CompatibilityChecker::new(config.require_storage_content_compatibility),
        );

        Ok(Self { processor, driver })
    }

    /// A handle to the query surface, usable while the syncer runs.
    pub fn processor(&self) -> BridgeProcessor {
        self.processor.clone()
    }

    /// Runs the synchronization until cancelled or a fatal error occurs.
    pub async fn start(self, ct: CancellationToken) -> Result<(), SyncError> {
        self.driver.sync(ct).await
    }
}
