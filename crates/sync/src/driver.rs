use crate::{
    BlockProcessor, CompatibilityChecker, DriverMetrics, EvmBlock, EvmDownloader, RetryHandler,
    SyncError,
};

use aggkit_client::EthClient;
use alloy_primitives::B256;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A reorg subscription handed to a driver: reorged block numbers arrive on
/// `reorged_block_rx`; the driver acks on `reorg_processed_tx` once its state
/// is unwound so the detector can continue.
#[derive(Debug)]
pub struct ReorgSubscription {
    /// Receives the lowest reorged block number.
    pub reorged_block_rx: mpsc::Receiver<u64>,
    /// Acks that the reorg has been processed.
    pub reorg_processed_tx: mpsc::Sender<()>,
}

/// The reorg detector interface the driver couples to.
#[async_trait::async_trait]
pub trait ReorgDetector: Send + Sync {
    /// Subscribes the given id, idempotently.
    async fn subscribe(&self, id: &str) -> Result<ReorgSubscription, SyncError>;

    /// Records a block hash to watch for the given subscriber.
    async fn add_block_to_track(&self, id: &str, num: u64, hash: B256)
        -> Result<(), SyncError>;
}

/// Couples a downloader to a processor: routes new blocks forward, routes
/// reorg notifications back, single writer per syncer.
#[derive(Debug)]
pub struct EvmDriver<C, P: BlockProcessor, R> {
    reorg_detector: Arc<R>,
    processor: P,
    downloader: Arc<EvmDownloader<C, P::Event>>,
    reorg_detector_id: String,
    download_buffer_size: usize,
    retry: RetryHandler,
    compatibility: CompatibilityChecker,
    metrics: DriverMetrics,
}

impl<C, P, R> EvmDriver<C, P, R>
where
    C: EthClient + 'static,
    P: BlockProcessor,
    P::Event: Clone,
    R: ReorgDetector,
{
    /// Returns a new instance of [`EvmDriver`].
    pub fn new(
        reorg_detector: Arc<R>,
        processor: P,
        downloader: EvmDownloader<C, P::Event>,
        reorg_detector_id: impl Into<String>,
        download_buffer_size: usize,
        retry: RetryHandler,
        compatibility: CompatibilityChecker,
    ) -> Self {
        Self {
            reorg_detector,
            processor,
            downloader: Arc::new(downloader),
            reorg_detector_id: reorg_detector_id.into(),
            download_buffer_size,
            retry,
            compatibility,
            metrics: DriverMetrics::default(),
        }
    }

    /// Runs the sync loop until cancelled or a fatal error occurs. On a
    /// reorg, the downloader is paused, the processor unwinds, the detector
    /// is acked, and downloading restarts after the last processed block.
    pub async fn sync(mut self, ct: CancellationToken) -> Result<(), SyncError> {
        // never reuse a database built against a different chain or contracts.
        let live = self.downloader.runtime_data().await?;
        self.compatibility.check(&self.processor, live).await?;

        let mut subscription = self.reorg_detector.subscribe(&self.reorg_detector_id).await?;

        loop {
            let last_processed = self.processor.get_last_processed_block().await?;
            let from_block = last_processed + 1;
            tracing::info!(target: "aggkit::sync", syncer = %self.reorg_detector_id, from_block, "starting downloader");

            let (tx, mut rx) = mpsc::channel(self.download_buffer_size);
            let download_ct = ct.child_token();
            let download_task = tokio::spawn(
                self.downloader.clone().download(download_ct.clone(), from_block, tx),
            );

            loop {
                tokio::select! {
                    _ = ct.cancelled() => {
                        download_ct.cancel();
                        let _ = download_task.await;
                        return Ok(());
                    }
                    block = rx.recv() => {
                        let Some(block) = block else {
                            if ct.is_cancelled() {
                                return Ok(());
                            }
                            // downloader ended on its own: fatal.
                            return Err(SyncError::Cancelled);
                        };
                        self.handle_block(block).await?;
                    }
                    reorged = subscription.reorged_block_rx.recv() => {
                        let Some(first_reorged_block) = reorged else {
                            return Err(SyncError::ReorgDetector("reorg channel closed".into()));
                        };
                        download_ct.cancel();
                        let _ = download_task.await;
                        // drain blocks downloaded before the pause.
                        while rx.try_recv().is_ok() {}
                        self.handle_reorg(&subscription.reorg_processed_tx, first_reorged_block)
                            .await?;
                        // restart the downloader after the unwound state.
                        break;
                    }
                }
            }
        }
    }

    async fn handle_block(&mut self, block: EvmBlock<P::Event>) -> Result<(), SyncError> {
        self.reorg_detector
            .add_block_to_track(&self.reorg_detector_id, block.header.num, block.header.hash)
            .await?;

        let mut attempts = 0;
        loop {
            match self.processor.process_block(block.clone()).await {
                Ok(()) => {
                    self.metrics.processed_blocks.increment(1);
                    return Ok(());
                }
                Err(err) if err.is_inconsistent_state() => {
                    tracing::error!(target: "aggkit::sync", syncer = %self.reorg_detector_id, %err, "halting: processor entered an inconsistent state");
                    return Err(err.into());
                }
                Err(err) => {
                    attempts += 1;
                    tracing::error!(target: "aggkit::sync", syncer = %self.reorg_detector_id, %err, num = block.header.num, "error processing block");
                    self.retry.handle("process_block", attempts).await?;
                }
            }
        }
    }

    async fn handle_reorg(
        &mut self,
        processed_tx: &mpsc::Sender<()>,
        first_reorged_block: u64,
    ) -> Result<(), SyncError> {
        tracing::info!(target: "aggkit::sync", syncer = %self.reorg_detector_id, first_reorged_block, "handling reorg");
        let last_processed = self.processor.get_last_processed_block().await.unwrap_or(0);

        let mut attempts = 0;
        loop {
            match self.processor.reorg(first_reorged_block).await {
                Ok(()) => break,
                Err(err) => {
                    attempts += 1;
                    tracing::error!(target: "aggkit::sync", syncer = %self.reorg_detector_id, %err, first_reorged_block, "error processing reorg");
                    self.retry.handle("reorg", attempts).await?;
                }
            }
        }

        self.metrics.reorgs.increment(1);
        self.metrics.reorg_depths.record(last_processed.saturating_sub(first_reorged_block) as f64);

        // unblock the detector only after the state is unwound.
        let _ = processed_tx.send(()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockProcessor, EvmBlockHeader, LogAppenderMap, ProcessorError};

    use aggkit_client::test_utils::{header, MockEthClient};
    use aggkit_primitives::{BlockNumberFinality, RuntimeData};
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    #[derive(Debug, Default)]
    struct ProcessorState {
        blocks: Vec<EvmBlockHeader>,
        reorgs: Vec<u64>,
        runtime_data: Option<RuntimeData>,
    }

    #[derive(Debug, Clone, Default)]
    struct TestProcessor {
        state: Arc<Mutex<ProcessorState>>,
    }

    #[async_trait::async_trait]
    impl BlockProcessor for TestProcessor {
        type Event = B256;

        async fn process_block(
            &mut self,
            block: crate::EvmBlock<B256>,
        ) -> Result<(), ProcessorError> {
            self.state.lock().unwrap().blocks.push(block.header);
            Ok(())
        }

        async fn reorg(&mut self, first_reorged_block: u64) -> Result<(), ProcessorError> {
            let mut state = self.state.lock().unwrap();
            state.reorgs.push(first_reorged_block);
            state.blocks.retain(|header| header.num < first_reorged_block);
            Ok(())
        }

        async fn get_last_processed_block(&self) -> Result<u64, ProcessorError> {
            Ok(self.state.lock().unwrap().blocks.last().map(|header| header.num).unwrap_or(0))
        }

        async fn get_runtime_data(&self) -> Result<Option<RuntimeData>, ProcessorError> {
            Ok(self.state.lock().unwrap().runtime_data.clone())
        }

        async fn set_runtime_data(&self, data: RuntimeData) -> Result<(), ProcessorError> {
            self.state.lock().unwrap().runtime_data = Some(data);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct TestReorgDetector {
        tracked: Mutex<Vec<(u64, B256)>>,
        subscription: Mutex<Option<ReorgSubscription>>,
    }

    impl TestReorgDetector {
        fn new() -> (Arc<Self>, mpsc::Sender<u64>, mpsc::Receiver<()>) {
            let (reorg_tx, reorg_rx) = mpsc::channel(1);
            let (processed_tx, processed_rx) = mpsc::channel(1);
            let detector = Arc::new(Self {
                tracked: Mutex::new(vec![]),
                subscription: Mutex::new(Some(ReorgSubscription {
                    reorged_block_rx: reorg_rx,
                    reorg_processed_tx: processed_tx,
                })),
            });
            (detector, reorg_tx, processed_rx)
        }
    }

    #[async_trait::async_trait]
    impl ReorgDetector for TestReorgDetector {
        async fn subscribe(&self, _id: &str) -> Result<ReorgSubscription, SyncError> {
            self.subscription
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| SyncError::ReorgDetector("already subscribed".into()))
        }

        async fn add_block_to_track(
            &self,
            _id: &str,
            num: u64,
            hash: B256,
        ) -> Result<(), SyncError> {
            self.tracked.lock().unwrap().push((num, hash));
            Ok(())
        }
    }

    fn test_downloader(client: Arc<MockEthClient>) -> EvmDownloader<MockEthClient, B256> {
        let mut appenders = LogAppenderMap::new();
        appenders.insert(
            B256::repeat_byte(0x77),
            |_: &EvmBlockHeader, _: &alloy_rpc_types_eth::Log| Ok(B256::ZERO),
        );
        EvmDownloader::new(
            "driver-test",
            client,
            10,
            BlockNumberFinality::Latest,
            Duration::from_millis(1),
            appenders,
            vec![],
            RetryHandler {
                retry_after_error_period: Duration::from_millis(1),
                max_retry_attempts_after_error: 3,
            },
            BlockNumberFinality::Finalized,
        )
    }

    #[tokio::test]
    async fn test_driver_processes_blocks_and_tracks_them() {
        // Given: head and finalized at block 2.
        let client = Arc::new(MockEthClient::new(1));
        client.push_latest(header(2));
        client.push_finalized(header(2));
        client.push_header(header(2));
        let processor = TestProcessor::default();
        let state = processor.state.clone();
        let (detector, _reorg_tx, _processed_rx) = TestReorgDetector::new();

        let driver = EvmDriver::new(
            detector.clone(),
            processor,
            test_downloader(client),
            "driver-test",
            16,
            RetryHandler::default(),
            CompatibilityChecker::new(true),
        );

        // When
        let ct = CancellationToken::new();
        let handle = tokio::spawn(driver.sync(ct.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        ct.cancel();
        handle.await.unwrap().unwrap();

        // Then: the checkpoint block was processed and registered with the
        // reorg detector, and the runtime data was persisted.
        assert_eq!(state.lock().unwrap().blocks.last().map(|h| h.num), Some(2));
        assert!(detector.tracked.lock().unwrap().iter().any(|(num, _)| *num == 2));
        assert_eq!(state.lock().unwrap().runtime_data.as_ref().map(|rd| rd.chain_id), Some(1));
    }

    #[tokio::test]
    async fn test_driver_unwinds_on_reorg_and_acks() {
        // Given
        let client = Arc::new(MockEthClient::new(1));
        client.push_latest(header(2));
        client.push_finalized(header(2));
        client.push_header(header(2));
        let processor = TestProcessor::default();
        let state = processor.state.clone();
        let (detector, reorg_tx, mut processed_rx) = TestReorgDetector::new();

        let driver = EvmDriver::new(
            detector,
            processor,
            test_downloader(client),
            "driver-test",
            16,
            RetryHandler::default(),
            CompatibilityChecker::new(true),
        );

        // When: let the driver sync to block 2, then reorg from block 2.
        let ct = CancellationToken::new();
        let handle = tokio::spawn(driver.sync(ct.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        reorg_tx.send(2).await.unwrap();

        // Then: the ack arrives only after the processor unwound.
        processed_rx.recv().await.unwrap();
        {
            let state = state.lock().unwrap();
            assert_eq!(state.reorgs, vec![2]);
            assert!(state.blocks.iter().all(|header| header.num < 2));
        }
        ct.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_incompatible_storage_refuses_to_start() {
        // Given: storage recorded a different chain id.
        let client = Arc::new(MockEthClient::new(1));
        let processor = TestProcessor::default();
        processor
            .set_runtime_data(RuntimeData { chain_id: 31337, addresses: vec![] })
            .await
            .unwrap();
        let (detector, _reorg_tx, _processed_rx) = TestReorgDetector::new();

        let driver = EvmDriver::new(
            detector,
            processor,
            test_downloader(client),
            "driver-test",
            16,
            RetryHandler::default(),
            CompatibilityChecker::new(true),
        );

        // When
        let result = driver.sync(CancellationToken::new()).await;

        // Then
        assert!(matches!(result, Err(SyncError::IncompatibleStorage { .. })));
    }
}
