//! Detects L1/L2 chain reorganizations for the syncers.
//!
//! Each subscriber (one per driver) registers the block hashes it has
//! processed. On every poll the detector re-fetches the canonical hash of
//! every tracked block still inside the unfinalized window and, if any
//! differs, publishes the lowest mismatched block number on the subscriber's
//! channel. The detector then blocks until the driver acks that its state is
//! unwound, so tracked state and processed state never diverge.

use aggkit_client::EthClient;
use aggkit_primitives::BlockNumberFinality;
use aggkit_sync::{ReorgSubscription, SyncError};
use alloy_primitives::B256;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

const REORG_CHANNEL_CAPACITY: usize = 1;

/// An error returned by the [`ReorgDetector`].
#[derive(Debug, thiserror::Error)]
pub enum ReorgDetectorError {
    /// The RPC client failed.
    #[error(transparent)]
    Client(#[from] aggkit_client::ClientError),
    /// A block was registered for an unknown subscriber.
    #[error("unknown subscriber: {0}")]
    UnknownSubscriber(String),
}

#[derive(Debug)]
struct Subscriber {
    tracked: BTreeMap<u64, B256>,
    reorg_tx: mpsc::Sender<u64>,
    reorg_processed_rx: mpsc::Receiver<()>,
}

/// Watches tracked block hashes of named subscribers and publishes the
/// lowest reorged block number on divergence.
#[derive(Debug)]
pub struct ReorgDetector<C> {
    client: Arc<C>,
    check_interval: Duration,
    finality: BlockNumberFinality,
    subscribers: Mutex<HashMap<String, Subscriber>>,
}

impl<C: EthClient> ReorgDetector<C> {
    /// Returns a new instance of [`ReorgDetector`]. Blocks that reach
    /// `finality` are dropped from the watch sets.
    pub fn new(client: Arc<C>, check_interval: Duration, finality: BlockNumberFinality) -> Self {
        Self { client, check_interval, finality, subscribers: Mutex::new(HashMap::new()) }
    }

    /// Subscribes the given id. Re-subscribing an id replaces its previous
    /// subscription and keeps the tracked set.
    pub async fn subscribe(&self, id: &str) -> ReorgSubscription {
        let (reorg_tx, reorged_block_rx) = mpsc::channel(REORG_CHANNEL_CAPACITY);
        let (reorg_processed_tx, reorg_processed_rx) = mpsc::channel(REORG_CHANNEL_CAPACITY);

        let mut subscribers = self.subscribers.lock().await;
        let tracked = subscribers.remove(id).map(|sub| sub.tracked).unwrap_or_default();
        subscribers
            .insert(id.to_owned(), Subscriber { tracked, reorg_tx, reorg_processed_rx });

        tracing::debug!(target: "aggkit::reorg_detector", id, "subscribed");
        ReorgSubscription { reorged_block_rx, reorg_processed_tx }
    }

    /// Records a block hash to watch for the given subscriber.
    pub async fn add_block_to_track(
        &self,
        id: &str,
        num: u64,
        hash: B256,
    ) -> Result<(), ReorgDetectorError> {
        let mut subscribers = self.subscribers.lock().await;
        let subscriber = subscribers
            .get_mut(id)
            .ok_or_else(|| ReorgDetectorError::UnknownSubscriber(id.to_owned()))?;
        subscriber.tracked.insert(num, hash);
        Ok(())
    }

    /// Polls at the configured interval until cancelled.
    pub async fn start(self: Arc<Self>, ct: CancellationToken) {
        let mut ticker = tokio::time::interval(self.check_interval);
        loop {
            tokio::select! {
                _ = ct.cancelled() => {
                    tracing::info!(target: "aggkit::reorg_detector", "stopping reorg detector");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.step(&ct).await {
                        tracing::error!(target: "aggkit::reorg_detector", %err, "reorg detection step failed");
                    }
                }
            }
        }
    }

    /// One poll round: prune finalized blocks, then compare every tracked
    /// hash against the canonical chain.
    pub async fn step(&self, ct: &CancellationToken) -> Result<(), ReorgDetectorError> {
        let finalized = self
            .client
            .header_by_tag(self.finality.as_tag())
            .await?
            .map(|header| header.inner.number);

        let ids: Vec<String> = {
            let subscribers = self.subscribers.lock().await;
            subscribers.keys().cloned().collect()
        };

        for id in ids {
            if ct.is_cancelled() {
                return Ok(());
            }
            self.check_subscriber(&id, finalized).await?;
        }
        Ok(())
    }

    async fn check_subscriber(
        &self,
        id: &str,
        finalized: Option<u64>,
    ) -> Result<(), ReorgDetectorError> {
        // prune and snapshot the watch set without holding the lock over the
        // canonical-hash queries.
        let tracked: Vec<(u64, B256)> = {
            let mut subscribers = self.subscribers.lock().await;
            let Some(subscriber) = subscribers.get_mut(id) else { return Ok(()) };
            if let Some(finalized) = finalized {
                subscriber.tracked.retain(|num, _| *num > finalized);
            }
            subscriber.tracked.iter().map(|(num, hash)| (*num, *hash)).collect()
        };

        let mut first_reorged_block = None;
        for (num, hash) in tracked {
            let canonical = self.client.header_by_number(num).await?.map(|header| header.hash);
            if canonical != Some(hash) {
                tracing::info!(
                    target: "aggkit::reorg_detector",
                    id,
                    num,
                    tracked = ?hash,
                    ?canonical,
                    "tracked block diverged from the canonical chain"
                );
                first_reorged_block = Some(num);
                break;
            }
        }

        let Some(first_reorged_block) = first_reorged_block else { return Ok(()) };
        self.notify_reorg(id, first_reorged_block).await;
        Ok(())
    }

    /// Publishes the reorg and waits for the subscriber to unwind before
    /// returning, then drops the no-longer-canonical tracked blocks.
    async fn notify_reorg(&self, id: &str, first_reorged_block: u64) {
        let mut subscribers = self.subscribers.lock().await;
        let Some(subscriber) = subscribers.get_mut(id) else { return };

        if subscriber.reorg_tx.send(first_reorged_block).await.is_err() {
            tracing::warn!(target: "aggkit::reorg_detector", id, "subscriber dropped its reorg channel");
            return;
        }
        if subscriber.reorg_processed_rx.recv().await.is_none() {
            tracing::warn!(target: "aggkit::reorg_detector", id, "subscriber dropped its ack channel");
            return;
        }
        subscriber.tracked.retain(|num, _| *num < first_reorged_block);
        tracing::info!(target: "aggkit::reorg_detector", id, first_reorged_block, "reorg processed by subscriber");
    }
}

#[async_trait::async_trait]
impl<C: EthClient> aggkit_sync::ReorgDetector for ReorgDetector<C> {
    async fn subscribe(&self, id: &str) -> Result<ReorgSubscription, SyncError> {
        Ok(Self::subscribe(self, id).await)
    }

    async fn add_block_to_track(&self, id: &str, num: u64, hash: B256) -> Result<(), SyncError> {
        Self::add_block_to_track(self, id, num, hash)
            .await
            .map_err(|err| SyncError::ReorgDetector(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggkit_client::test_utils::{header, MockEthClient};

    fn detector(client: Arc<MockEthClient>) -> Arc<ReorgDetector<MockEthClient>> {
        Arc::new(ReorgDetector::new(
            client,
            Duration::from_millis(1),
            BlockNumberFinality::Finalized,
        ))
    }

    #[tokio::test]
    async fn test_publishes_lowest_reorged_block_and_waits_for_ack() {
        // Given: blocks 4 tracked correctly, 5 and 6 tracked with stale
        // hashes.
        let client = Arc::new(MockEthClient::new(1));
        client.push_finalized(header(3));
        client.push_header(header(4));
        client.push_header(header(5));
        client.push_header(header(6));
        let detector = detector(client);

        let mut subscription = detector.subscribe("syncer").await;
        detector.add_block_to_track("syncer", 4, header(4).hash).await.unwrap();
        detector.add_block_to_track("syncer", 5, B256::repeat_byte(0xde)).await.unwrap();
        detector.add_block_to_track("syncer", 6, B256::repeat_byte(0xad)).await.unwrap();

        // When
        let handle = {
            let detector = detector.clone();
            tokio::spawn(async move { detector.step(&CancellationToken::new()).await })
        };

        // Then: the lowest diverged block is published and the detector
        // waits for the ack before finishing the round.
        let reorged = subscription.reorged_block_rx.recv().await.unwrap();
        assert_eq!(reorged, 5);
        assert!(!handle.is_finished());
        subscription.reorg_processed_tx.send(()).await.unwrap();
        handle.await.unwrap().unwrap();

        // the stale blocks are dropped from the watch set, block 4 remains.
        let subscribers = detector.subscribers.lock().await;
        let tracked = &subscribers.get("syncer").unwrap().tracked;
        assert_eq!(tracked.keys().copied().collect::<Vec<_>>(), vec![4]);
    }

    #[tokio::test]
    async fn test_finalized_blocks_leave_the_watch_set() {
        // Given: finality reached block 5.
        let client = Arc::new(MockEthClient::new(1));
        client.push_finalized(header(5));
        client.push_header(header(6));
        let detector = detector(client);

        let _subscription = detector.subscribe("syncer").await;
        detector.add_block_to_track("syncer", 4, B256::repeat_byte(0xde)).await.unwrap();
        detector.add_block_to_track("syncer", 6, header(6).hash).await.unwrap();

        // When: the stale hash at block 4 is already finalized, so no reorg
        // fires even though it diverges.
        detector.step(&CancellationToken::new()).await.unwrap();

        // Then
        let subscribers = detector.subscribers.lock().await;
        let tracked = &subscribers.get("syncer").unwrap().tracked;
        assert_eq!(tracked.keys().copied().collect::<Vec<_>>(), vec![6]);
    }

    #[tokio::test]
    async fn test_matching_hashes_publish_nothing() {
        let client = Arc::new(MockEthClient::new(1));
        client.push_finalized(header(1));
        client.push_header(header(2));
        client.push_header(header(3));
        let detector = detector(client);

        let mut subscription = detector.subscribe("syncer").await;
        detector.add_block_to_track("syncer", 2, header(2).hash).await.unwrap();
        detector.add_block_to_track("syncer", 3, header(3).hash).await.unwrap();

        detector.step(&CancellationToken::new()).await.unwrap();

        assert!(subscription.reorged_block_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_tracking_for_unknown_subscriber_fails() {
        let client = Arc::new(MockEthClient::new(1));
        let detector = detector(client);
        let err = detector.add_block_to_track("ghost", 1, B256::ZERO).await.unwrap_err();
        assert!(matches!(err, ReorgDetectorError::UnknownSubscriber(_)));
    }
}
