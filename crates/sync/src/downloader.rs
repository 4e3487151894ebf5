use crate::{EvmBlock, EvmBlockHeader, LogAppenderMap, RetryHandler, SyncError};

use aggkit_client::EthClient;
use aggkit_primitives::{BlockNumberFinality, RuntimeData};
use alloy_primitives::{Address, B256};
use alloy_rpc_types_eth::{Filter, Log};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How often the whole range is re-queried when the block hash seen in a log
/// does not match the header fetched afterwards.
pub const MAX_RETRY_COUNT_BLOCK_HASH_MISMATCH: u32 = 5;

/// The pause before re-fetching a header the endpoint claims not to know.
/// Blocks can briefly disappear from the execution client during a reorg.
const DEFAULT_WAIT_PERIOD_BLOCK_NOT_FOUND: Duration = Duration::from_millis(100);

enum RangeOutcome<E> {
    Blocks(Vec<EvmBlock<E>>),
    HashMismatchExhausted,
    Stopped,
}

/// Downloads chunked block ranges of filtered logs and assembles them into an
/// ordered stream of [`EvmBlock`]s delivered over a bounded channel.
#[derive(Debug)]
pub struct EvmDownloader<C, E> {
    syncer_id: String,
    client: Arc<C>,
    chunk_size: u64,
    finality: BlockNumberFinality,
    finalized_type: BlockNumberFinality,
    wait_for_new_blocks_period: Duration,
    appenders: LogAppenderMap<E>,
    addresses: Vec<Address>,
    topics: Vec<B256>,
    retry: RetryHandler,
}

impl<C: EthClient + 'static, E: Send + 'static> EvmDownloader<C, E> {
    /// Returns a new downloader. If the finalized tag is less finalized than
    /// the finality the syncer queries blocks with, it is clamped to the
    /// latter.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        syncer_id: impl Into<String>,
        client: Arc<C>,
        chunk_size: u64,
        finality: BlockNumberFinality,
        wait_for_new_blocks_period: Duration,
        appenders: LogAppenderMap<E>,
        addresses: Vec<Address>,
        retry: RetryHandler,
        finalized_type: BlockNumberFinality,
    ) -> Self {
        let syncer_id = syncer_id.into();
        let finalized_type = if finalized_type.is_at_least(&finality) {
            finalized_type
        } else {
            tracing::warn!(
                target: "aggkit::sync",
                syncer = %syncer_id,
                %finalized_type,
                %finality,
                "finalized block type is less finalized than the block finality, clamping"
            );
            finality
        };
        tracing::info!(
            target: "aggkit::sync",
            syncer = %syncer_id,
            %finality,
            %finalized_type,
            chunk_size,
            "downloader initialized"
        );
        let topics = appenders.topics();
        Self {
            syncer_id,
            client,
            chunk_size,
            finality,
            finalized_type,
            wait_for_new_blocks_period,
            appenders,
            addresses,
            topics,
            retry,
        }
    }

    /// The runtime identity of the downloader: chain id plus the queried
    /// contract addresses.
    pub async fn runtime_data(&self) -> Result<RuntimeData, SyncError> {
        let chain_id = self.client.chain_id().await?;
        Ok(RuntimeData { chain_id, addresses: self.addresses.clone() })
    }

    /// Downloads blocks starting at `from_block`, delivering them in strictly
    /// ascending order on `tx`. Runs until cancelled or until an error
    /// exhausts its retry budget; the channel closes when the task ends.
    pub async fn download(
        self: Arc<Self>,
        ct: CancellationToken,
        from_block: u64,
        tx: mpsc::Sender<EvmBlock<E>>,
    ) {
        let Some(mut last_block) = self.wait_for_new_blocks(&ct, 0).await else {
            tracing::info!(target: "aggkit::sync", syncer = %self.syncer_id, "closing evm downloader channel");
            return;
        };
        let mut from_block = from_block;
        let mut to_block = from_block + self.chunk_size;
        let mut reached_top = false;

        loop {
            if ct.is_cancelled() {
                tracing::info!(target: "aggkit::sync", syncer = %self.syncer_id, "closing evm downloader channel");
                return;
            }
            tracing::debug!(target: "aggkit::sync", syncer = %self.syncer_id, from_block, to_block, last_block, "download range");

            if from_block > last_block || (reached_top && to_block >= last_block) {
                match self.wait_for_new_blocks(&ct, last_block).await {
                    Some(new_last) => last_block = new_last,
                    None => return,
                }
                to_block = from_block + self.chunk_size;
            }
            reached_top = false;

            let last_finalized = match self.get_last_finalized_block().await {
                Ok(number) => number.min(last_block),
                Err(err) => {
                    tracing::error!(target: "aggkit::sync", syncer = %self.syncer_id, %err, "error getting last finalized block");
                    continue;
                }
            };

            let mut request_to_block = to_block;
            if to_block >= last_block {
                request_to_block = last_block;
                reached_top = true;
            }

            let blocks =
                match self.get_events_by_block_range(&ct, from_block, request_to_block).await {
                    RangeOutcome::Blocks(blocks) => blocks,
                    // the whole range is retried from scratch.
                    RangeOutcome::HashMismatchExhausted => continue,
                    RangeOutcome::Stopped => return,
                };

            if request_to_block <= last_finalized {
                // the whole scanned range is final.
                let last_reported = blocks.last().map(|block| block.header.num);
                if self.report_blocks(&tx, blocks, last_finalized).await.is_err() {
                    return;
                }
                if last_reported.is_none_or(|num| num < request_to_block) &&
                    self.report_empty_block(&ct, &tx, request_to_block, last_finalized)
                        .await
                        .is_err()
                {
                    return;
                }
                from_block = request_to_block + 1;
            } else if blocks.is_empty() {
                if last_finalized >= from_block {
                    // checkpoint at the finalized head, the rest of the range
                    // is still reorgable.
                    if self
                        .report_empty_block(&ct, &tx, last_finalized, last_finalized)
                        .await
                        .is_err()
                    {
                        return;
                    }
                    from_block = last_finalized + 1;
                } else {
                    // extend the range until logs appear or finality catches
                    // up.
                    to_block += self.chunk_size;
                    continue;
                }
            } else {
                let last_reported = blocks.last().map(|block| block.header.num);
                if self.report_blocks(&tx, blocks, last_finalized).await.is_err() {
                    return;
                }
                from_block = last_reported.expect("blocks is non-empty") + 1;
            }
            to_block = from_block + self.chunk_size;
        }
    }

    async fn report_blocks(
        &self,
        tx: &mpsc::Sender<EvmBlock<E>>,
        blocks: Vec<EvmBlock<E>>,
        last_finalized: u64,
    ) -> Result<(), ()> {
        for mut block in blocks {
            block.is_finalized =
                self.finalized_type.is_finalized() && block.header.num <= last_finalized;
            tracing::debug!(target: "aggkit::sync", syncer = %self.syncer_id, num = block.header.num, events = block.events.len(), "sending block to the driver");
            if tx.send(block).await.is_err() {
                tracing::warn!(target: "aggkit::sync", syncer = %self.syncer_id, "driver channel closed, stopping downloader");
                return Err(());
            }
        }
        Ok(())
    }

    async fn report_empty_block(
        &self,
        ct: &CancellationToken,
        tx: &mpsc::Sender<EvmBlock<E>>,
        block_num: u64,
        last_finalized: u64,
    ) -> Result<(), ()> {
        let Some(header) = self.get_block_header(ct, block_num).await else {
            return Err(());
        };
        let is_finalized = self.finalized_type.is_finalized() && header.num <= last_finalized;
        tracing::debug!(target: "aggkit::sync", syncer = %self.syncer_id, num = header.num, "sending checkpoint block to the driver");
        tx.send(EvmBlock::empty(header, is_finalized)).await.map_err(|_| ())
    }

    /// Blocks until the chain head (at the configured finality) moves past
    /// `last_seen`, returning the new head. `None` means the task must stop.
    pub(crate) async fn wait_for_new_blocks(
        &self,
        ct: &CancellationToken,
        last_seen: u64,
    ) -> Option<u64> {
        let mut attempts = 0;
        let mut ticker = tokio::time::interval(self.wait_for_new_blocks_period);
        loop {
            tokio::select! {
                _ = ct.cancelled() => {
                    tracing::info!(target: "aggkit::sync", syncer = %self.syncer_id, "context cancelled");
                    return None;
                }
                _ = ticker.tick() => {
                    match self.client.header_by_tag(self.finality.as_tag()).await {
                        Ok(Some(header)) if header.inner.number > last_seen => {
                            return Some(header.inner.number);
                        }
                        Ok(_) => {}
                        Err(err) => {
                            attempts += 1;
                            tracing::error!(target: "aggkit::sync", syncer = %self.syncer_id, %err, "error getting last block from eth client");
                            if self.retry.handle("wait_for_new_blocks", attempts).await.is_err() {
                                return None;
                            }
                        }
                    }
                }
            }
        }
    }

    async fn get_last_finalized_block(&self) -> Result<u64, SyncError> {
        let header = self
            .client
            .header_by_tag(self.finalized_type.as_tag())
            .await?
            .ok_or(aggkit_client::ClientError::Cancelled)?;
        Ok(header.inner.number)
    }

    async fn get_events_by_block_range(
        &self,
        ct: &CancellationToken,
        from_block: u64,
        to_block: u64,
    ) -> RangeOutcome<E> {
        let mut retry_count = 0;
        'retry: loop {
            if ct.is_cancelled() {
                return RangeOutcome::Stopped;
            }
            let Some(logs) = self.get_logs(ct, from_block, to_block).await else {
                return RangeOutcome::Stopped;
            };

            let mut blocks: Vec<EvmBlock<E>> = Vec::with_capacity(logs.len());
            for log in &logs {
                let log_block_num = log.block_number.expect("log carries a block number");
                let log_block_hash = log.block_hash.expect("log carries a block hash");

                if blocks.last().map(|block| block.header.num) != Some(log_block_num) {
                    let Some(header) = self.get_block_header(ct, log_block_num).await else {
                        return RangeOutcome::Stopped;
                    };
                    if header.hash != log_block_hash {
                        tracing::info!(
                            target: "aggkit::sync",
                            syncer = %self.syncer_id,
                            block = log_block_num,
                            header_hash = ?header.hash,
                            log_hash = ?log_block_hash,
                            retry_count,
                            "block hash changed between the log query and the header query"
                        );
                        if retry_count >= MAX_RETRY_COUNT_BLOCK_HASH_MISMATCH {
                            tracing::error!(
                                target: "aggkit::sync",
                                syncer = %self.syncer_id,
                                block = log_block_num,
                                "max retry attempts reached for block hash mismatch, discarding range"
                            );
                            return RangeOutcome::HashMismatchExhausted;
                        }
                        retry_count += 1;
                        continue 'retry;
                    }
                    blocks.push(EvmBlock::empty(header, false));
                }

                let appender = self
                    .appenders
                    .get(&log.topics()[0])
                    .expect("topic was filtered against the appender map");
                let current = blocks.last_mut().expect("a block was pushed for this log");
                let mut attempts = 0;
                loop {
                    match appender(&current.header, log) {
                        Ok(event) => {
                            current.events.push(event);
                            break;
                        }
                        Err(err) => {
                            attempts += 1;
                            tracing::error!(target: "aggkit::sync", syncer = %self.syncer_id, %err, "error trying to append log");
                            if self.retry.handle("append_log", attempts).await.is_err() {
                                return RangeOutcome::Stopped;
                            }
                        }
                    }
                }
            }

            return RangeOutcome::Blocks(blocks);
        }
    }

    /// Queries logs for the range, dropping removed logs and logs whose first
    /// topic has no appender. `None` means the task must stop.
    async fn get_logs(
        &self,
        ct: &CancellationToken,
        from_block: u64,
        to_block: u64,
    ) -> Option<Vec<Log>> {
        let filter = Filter::new()
            .address(self.addresses.clone())
            .event_signature(self.topics.clone())
            .from_block(from_block)
            .to_block(to_block);

        let mut attempts = 0;
        let logs = loop {
            if ct.is_cancelled() {
                return None;
            }
            match self.client.logs(&filter).await {
                Ok(logs) => break logs,
                Err(err) => {
                    attempts += 1;
                    tracing::error!(target: "aggkit::sync", syncer = %self.syncer_id, %err, from_block, to_block, "error calling get_logs");
                    if self.retry.handle("get_logs", attempts).await.is_err() {
                        return None;
                    }
                }
            }
        };

        Some(
            logs.into_iter()
                .filter(|log| {
                    if log.removed {
                        tracing::warn!(target: "aggkit::sync", syncer = %self.syncer_id, ?log, "removed log dropped");
                        return false;
                    }
                    log.topics().first().is_some_and(|topic| self.appenders.contains(topic))
                })
                .collect(),
        )
    }

    /// Fetches the header for a block number, waiting out transient
    /// not-found responses. `None` means the task must stop.
    pub(crate) async fn get_block_header(
        &self,
        ct: &CancellationToken,
        block_num: u64,
    ) -> Option<EvmBlockHeader> {
        let mut attempts = 0;
        loop {
            if ct.is_cancelled() {
                return None;
            }
            match self.client.header_by_number(block_num).await {
                Ok(Some(header)) => return Some((&header).into()),
                Ok(None) => {
                    tracing::warn!(target: "aggkit::sync", syncer = %self.syncer_id, block_num, "block not found on the ethereum client");
                    let period = if self.retry.retry_after_error_period.is_zero() {
                        DEFAULT_WAIT_PERIOD_BLOCK_NOT_FOUND
                    } else {
                        self.retry.retry_after_error_period
                    };
                    tokio::time::sleep(period).await;
                }
                Err(err) => {
                    attempts += 1;
                    tracing::error!(target: "aggkit::sync", syncer = %self.syncer_id, block_num, %err, "error getting block header");
                    if self.retry.handle("get_block_header", attempts).await.is_err() {
                        return None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogAppenderMap;

    use aggkit_client::test_utils::{header, MockEthClient};
    use alloy_primitives::{keccak256, LogData};

    const EVENT_SIGNATURE: B256 = B256::repeat_byte(0x77);

    fn test_event(block_num: u64) -> B256 {
        keccak256(block_num.to_be_bytes())
    }

    fn log_at(block_num: u64, topic: B256) -> Log {
        let mut log = Log::default();
        log.inner.data = LogData::new_unchecked(vec![topic], Default::default());
        log.block_number = Some(block_num);
        log.block_hash = Some(header(block_num).hash);
        log
    }

    fn downloader(
        client: Arc<MockEthClient>,
        chunk_size: u64,
    ) -> EvmDownloader<MockEthClient, B256> {
        let mut appenders = LogAppenderMap::new();
        appenders
            .insert(EVENT_SIGNATURE, |header: &EvmBlockHeader, _log: &Log| Ok(test_event(header.num)));
        EvmDownloader::new(
            "test-syncer",
            client,
            chunk_size,
            aggkit_primitives::BlockNumberFinality::Latest,
            Duration::from_millis(1),
            appenders,
            vec![Address::repeat_byte(1)],
            RetryHandler {
                retry_after_error_period: Duration::from_millis(1),
                max_retry_attempts_after_error: 3,
            },
            aggkit_primitives::BlockNumberFinality::Finalized,
        )
    }

    #[tokio::test]
    async fn test_single_event_in_single_block_range() {
        // Given
        let client = Arc::new(MockEthClient::new(1));
        client.push_header(header(3));
        client.push_logs(vec![log_at(3, EVENT_SIGNATURE)]);
        let downloader = downloader(client, 10);

        // When
        let ct = CancellationToken::new();
        let RangeOutcome::Blocks(blocks) = downloader.get_events_by_block_range(&ct, 3, 3).await
        else {
            panic!("expected blocks");
        };

        // Then
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].header.num, 3);
        assert_eq!(blocks[0].events, vec![test_event(3)]);
    }

    #[tokio::test]
    async fn test_logs_with_unknown_topics_are_dropped() {
        // Given
        let client = Arc::new(MockEthClient::new(1));
        client.push_header(header(3));
        client.push_logs(vec![log_at(3, B256::repeat_byte(0x01)), log_at(3, EVENT_SIGNATURE)]);
        let downloader = downloader(client, 10);

        // When
        let logs = downloader.get_logs(&CancellationToken::new(), 3, 3).await.unwrap();

        // Then
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].topics()[0], EVENT_SIGNATURE);
    }

    #[tokio::test]
    async fn test_removed_logs_never_appear() {
        // Given
        let client = Arc::new(MockEthClient::new(1));
        let mut removed = log_at(3, EVENT_SIGNATURE);
        removed.removed = true;
        client.push_logs(vec![removed]);
        let downloader = downloader(client, 10);

        // When
        let logs = downloader.get_logs(&CancellationToken::new(), 3, 3).await.unwrap();

        // Then
        assert!(logs.is_empty());
    }

    #[tokio::test]
    async fn test_block_hash_mismatch_recovers_within_retry_budget() {
        // Given: the first header for block 3 carries a stale hash.
        let client = Arc::new(MockEthClient::new(1));
        let mut stale = header(3);
        stale.hash = B256::repeat_byte(0xde);
        client.push_header(stale);
        client.push_header(header(3));
        client.push_logs(vec![log_at(3, EVENT_SIGNATURE)]);
        client.push_logs(vec![log_at(3, EVENT_SIGNATURE)]);
        let downloader = downloader(client, 10);

        // When
        let outcome =
            downloader.get_events_by_block_range(&CancellationToken::new(), 3, 3).await;

        // Then: the event is still delivered exactly once.
        let RangeOutcome::Blocks(blocks) = outcome else { panic!("expected blocks") };
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].events, vec![test_event(3)]);
    }

    #[tokio::test]
    async fn test_block_hash_mismatch_exhausts_budget_and_discards_range() {
        // Given: every header fetch returns a stale hash.
        let client = Arc::new(MockEthClient::new(1));
        let mut stale = header(3);
        stale.hash = B256::repeat_byte(0xde);
        client.push_header(stale);
        for _ in 0..=MAX_RETRY_COUNT_BLOCK_HASH_MISMATCH {
            client.push_logs(vec![log_at(3, EVENT_SIGNATURE)]);
        }
        let downloader = downloader(client, 10);

        // When
        let outcome =
            downloader.get_events_by_block_range(&CancellationToken::new(), 3, 3).await;

        // Then
        assert!(matches!(outcome, RangeOutcome::HashMismatchExhausted));
    }

    #[tokio::test]
    async fn test_wait_for_new_blocks_returns_on_higher_head() {
        // Given
        let client = Arc::new(MockEthClient::new(1));
        client.push_latest(header(5));
        client.push_latest(header(5));
        client.push_latest(header(6));
        let downloader = downloader(client, 10);

        // When
        let new_head =
            downloader.wait_for_new_blocks(&CancellationToken::new(), 5).await.unwrap();

        // Then
        assert_eq!(new_head, 6);
    }

    #[tokio::test]
    async fn test_empty_range_emits_checkpoint_block() {
        // Given: head and finalized at block 4, no logs at all.
        let client = Arc::new(MockEthClient::new(1));
        client.push_latest(header(4));
        client.push_finalized(header(4));
        client.push_header(header(4));
        let downloader = Arc::new(downloader(client, 10));

        // When
        let ct = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(16);
        let task = tokio::spawn(downloader.download(ct.clone(), 1, tx));
        let block = rx.recv().await.unwrap();
        ct.cancel();
        let _ = task.await;

        // Then: a checkpoint for the top of the scanned range, finalized.
        assert_eq!(block.header.num, 4);
        assert!(block.events.is_empty());
        assert!(block.is_finalized);
    }

    #[tokio::test]
    async fn test_download_delivers_blocks_in_ascending_order() {
        // Given: events at blocks 2 and 3, head and finalized at 3.
        let client = Arc::new(MockEthClient::new(1));
        client.push_latest(header(3));
        client.push_finalized(header(3));
        client.push_header(header(2));
        client.push_header(header(3));
        client.push_logs(vec![log_at(2, EVENT_SIGNATURE), log_at(3, EVENT_SIGNATURE)]);
        let downloader = Arc::new(downloader(client, 10));

        // When
        let ct = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(16);
        let task = tokio::spawn(downloader.download(ct.clone(), 1, tx));
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        ct.cancel();
        let _ = task.await;

        // Then
        assert_eq!(first.header.num, 2);
        assert_eq!(first.events, vec![test_event(2)]);
        assert!(first.is_finalized);
        assert_eq!(second.header.num, 3);
        assert_eq!(second.events, vec![test_event(3)]);
    }

    #[tokio::test]
    async fn test_finalized_type_clamped_to_finality() {
        let client = Arc::new(MockEthClient::new(1));
        let mut appenders = LogAppenderMap::new();
        appenders.insert(EVENT_SIGNATURE, |_: &EvmBlockHeader, _: &Log| Ok(B256::ZERO));
        let downloader: EvmDownloader<_, B256> = EvmDownloader::new(
            "clamped",
            client,
            10,
            aggkit_primitives::BlockNumberFinality::Finalized,
            Duration::from_millis(1),
            appenders,
            vec![],
            RetryHandler::default(),
            aggkit_primitives::BlockNumberFinality::Latest,
        );
        assert_eq!(downloader.finalized_type, aggkit_primitives::BlockNumberFinality::Finalized);
    }
}
