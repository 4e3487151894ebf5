use aggkit_client::EthClient;
use aggkit_primitives::BlockNumberFinality;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const BROADCAST_CAPACITY: usize = 32;

/// A new block observed on the watched chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventNewBlock {
    /// The block number.
    pub block_number: u64,
    /// The finality the block was observed at.
    pub block_finality: BlockNumberFinality,
}

/// Polls the chain head at a fixed period and broadcasts each new block to
/// its subscribers. The epoch notifier drives its clock off this feed.
#[derive(Debug)]
pub struct BlockNotifier<C> {
    client: Arc<C>,
    finality: BlockNumberFinality,
    poll_period: Duration,
    sender: broadcast::Sender<EventNewBlock>,
    current_block: AtomicU64,
}

impl<C: EthClient> BlockNotifier<C> {
    /// Returns a new instance of [`BlockNotifier`].
    pub fn new(client: Arc<C>, finality: BlockNumberFinality, poll_period: Duration) -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { client, finality, poll_period, sender, current_block: AtomicU64::new(0) }
    }

    /// Subscribes to the block feed.
    pub fn subscribe(&self) -> broadcast::Receiver<EventNewBlock> {
        self.sender.subscribe()
    }

    /// The last block number observed.
    pub fn current_block_number(&self) -> u64 {
        self.current_block.load(Ordering::Relaxed)
    }

    /// Polls until cancelled, publishing every head advance.
    pub async fn start(self: Arc<Self>, ct: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_period);
        loop {
            tokio::select! {
                _ = ct.cancelled() => {
                    tracing::info!(target: "aggkit::aggsender", "stopping block notifier");
                    return;
                }
                _ = ticker.tick() => {
                    match self.client.header_by_tag(self.finality.as_tag()).await {
                        Ok(Some(header)) => {
                            let number = header.inner.number;
                            let previous = self.current_block.swap(number, Ordering::Relaxed);
                            if number > previous {
                                let _ = self.sender.send(EventNewBlock {
                                    block_number: number,
                                    block_finality: self.finality,
                                });
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            tracing::error!(target: "aggkit::aggsender", %err, "block notifier failed to fetch head");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggkit_client::test_utils::{header, MockEthClient};

    #[tokio::test]
    async fn test_publishes_only_head_advances() {
        let client = Arc::new(MockEthClient::new(1));
        client.push_latest(header(5));
        client.push_latest(header(5));
        client.push_latest(header(6));
        let notifier = Arc::new(BlockNotifier::new(
            client,
            BlockNumberFinality::Latest,
            Duration::from_millis(1),
        ));
        let mut rx = notifier.subscribe();

        let ct = CancellationToken::new();
        let task = tokio::spawn(notifier.clone().start(ct.clone()));

        assert_eq!(rx.recv().await.unwrap().block_number, 5);
        assert_eq!(rx.recv().await.unwrap().block_number, 6);
        assert_eq!(notifier.current_block_number(), 6);

        ct.cancel();
        let _ = task.await;
    }
}
