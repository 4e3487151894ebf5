use crate::{block_notifier::EventNewBlock, error::AggsenderError};

use aggkit_agglayer::ClockConfiguration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

const MAX_PERCENT: u64 = 100;
const EPOCH_CHANNEL_CAPACITY: usize = 8;

/// The configuration of the per-block epoch clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochNotifierConfig {
    /// The L1 block the first epoch starts at.
    pub starting_epoch_block: u64,
    /// The number of L1 blocks per epoch.
    pub num_block_per_epoch: u64,
    /// When inside the epoch to notify: 0 fires at the epoch start, 50 at
    /// the middle. Must be below 100.
    pub epoch_notification_percentage: u64,
}

impl EpochNotifierConfig {
    /// Builds the config from the agglayer clock configuration.
    pub const fn from_clock(clock: ClockConfiguration, percentage: u64) -> Self {
        Self {
            starting_epoch_block: clock.genesis_block,
            num_block_per_epoch: clock.epoch_duration,
            epoch_notification_percentage: percentage,
        }
    }

    /// Validates the config.
    pub fn validate(&self) -> Result<(), AggsenderError> {
        if self.num_block_per_epoch == 0 {
            return Err(AggsenderError::InvalidEpochConfig(
                "num_block_per_epoch must be greater than 0".into(),
            ));
        }
        if self.epoch_notification_percentage >= MAX_PERCENT {
            return Err(AggsenderError::InvalidEpochConfig(
                "epoch_notification_percentage must be between 0 and 99".into(),
            ));
        }
        Ok(())
    }
}

/// The event published once per epoch when the notification threshold is
/// crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochEvent {
    /// The epoch that is closing.
    pub epoch: u64,
    /// L1 blocks remaining until the epoch closes.
    pub pending_blocks: u64,
}

#[derive(Debug, Clone, Copy)]
struct InternalStatus {
    last_block_seen: u64,
    waiting_for_epoch: u64,
}

/// Converts the L1 block feed into one [`EpochEvent`] per epoch, fired when
/// the configured percentage of the epoch has elapsed.
#[derive(Debug)]
pub struct EpochNotifier {
    config: EpochNotifierConfig,
    sender: mpsc::Sender<EpochEvent>,
}

impl EpochNotifier {
    /// Returns the notifier and the receiving end of its event channel.
    pub fn new(
        config: EpochNotifierConfig,
    ) -> Result<(Self, mpsc::Receiver<EpochEvent>), AggsenderError> {
        config.validate()?;
        let (sender, receiver) = mpsc::channel(EPOCH_CHANNEL_CAPACITY);
        Ok((Self { config, sender }, receiver))
    }

    /// Consumes the block feed until cancelled.
    pub async fn start(
        self,
        ct: CancellationToken,
        mut blocks: broadcast::Receiver<EventNewBlock>,
    ) {
        let mut status = InternalStatus {
            last_block_seen: self.config.starting_epoch_block,
            waiting_for_epoch: self.epoch_number(self.config.starting_epoch_block),
        };
        loop {
            tokio::select! {
                _ = ct.cancelled() => return,
                block = blocks.recv() => {
                    let block = match block {
                        Ok(block) => block,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(target: "aggkit::aggsender", skipped, "epoch notifier lagged behind the block feed");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    };
                    let (new_status, event) = self.step(status, block);
                    status = new_status;
                    if let Some(event) = event {
                        tracing::info!(target: "aggkit::aggsender", epoch = event.epoch, pending_blocks = event.pending_blocks, "epoch notification");
                        if self.sender.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }

    fn step(
        &self,
        mut status: InternalStatus,
        block: EventNewBlock,
    ) -> (InternalStatus, Option<EpochEvent>) {
        let current_block = block.block_number;
        if current_block < self.config.starting_epoch_block {
            tracing::warn!(
                target: "aggkit::aggsender",
                current_block,
                starting_epoch_block = self.config.starting_epoch_block,
                "block is before the first epoch, check the configuration"
            );
            return (status, None);
        }
        if current_block <= status.last_block_seen {
            return (status, None);
        }
        status.last_block_seen = current_block;

        let (notify, closing_epoch) =
            self.is_notification_required(current_block, status.waiting_for_epoch);
        if !notify {
            return (status, None);
        }

        status.waiting_for_epoch = closing_epoch + 1;
        let next_epoch_start = self.starting_block_of_epoch(closing_epoch + 1);
        let event =
            EpochEvent { epoch: closing_epoch, pending_blocks: next_epoch_start - current_block };
        (status, Some(event))
    }

    /// Notification fires once percent(current) crosses
    /// `max(pct/100, (N-1)/N)` capped at the last representable block of the
    /// epoch.
    fn is_notification_required(&self, current_block: u64, waiting_for_epoch: u64) -> (bool, u64) {
        let n = self.config.num_block_per_epoch;
        let epoch = self.epoch_number(current_block);
        let elapsed = current_block - self.starting_block_of_epoch(epoch);

        let threshold_blocks =
            ((self.config.epoch_notification_percentage * n) / MAX_PERCENT).min(n - 1);
        if elapsed < threshold_blocks {
            return (false, epoch);
        }
        (epoch + 1 > waiting_for_epoch, epoch)
    }

    fn starting_block_of_epoch(&self, epoch: u64) -> u64 {
        if epoch == 0 {
            return self.config.starting_epoch_block.saturating_sub(1);
        }
        self.config.starting_epoch_block + (epoch - 1) * self.config.num_block_per_epoch
    }

    /// Blocks before the starting block are epoch 0; the first epoch starts
    /// at the configured block.
    fn epoch_number(&self, block: u64) -> u64 {
        if block < self.config.starting_epoch_block {
            return 0;
        }
        1 + (block - self.config.starting_epoch_block) / self.config.num_block_per_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggkit_primitives::BlockNumberFinality;

    fn notifier(start: u64, n: u64, pct: u64) -> (EpochNotifier, mpsc::Receiver<EpochEvent>) {
        EpochNotifier::new(EpochNotifierConfig {
            starting_epoch_block: start,
            num_block_per_epoch: n,
            epoch_notification_percentage: pct,
        })
        .unwrap()
    }

    fn block(number: u64) -> EventNewBlock {
        EventNewBlock { block_number: number, block_finality: BlockNumberFinality::Latest }
    }

    fn run_blocks(
        notifier: &EpochNotifier,
        blocks: impl IntoIterator<Item = u64>,
    ) -> Vec<EpochEvent> {
        let mut status = InternalStatus {
            last_block_seen: notifier.config.starting_epoch_block,
            waiting_for_epoch: notifier.epoch_number(notifier.config.starting_epoch_block),
        };
        let mut events = Vec::new();
        for number in blocks {
            let (new_status, event) = notifier.step(status, block(number));
            status = new_status;
            events.extend(event);
        }
        events
    }

    #[test]
    fn test_single_notification_at_half_epoch() {
        // start=100, N=10, pct=50: blocks 100..=109 produce exactly one
        // event for epoch 1, at block >= 105.
        let (notifier, _rx) = notifier(100, 10, 50);
        let events = run_blocks(&notifier, 100..=109);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].epoch, 1);
        assert_eq!(events[0].pending_blocks, 5);
    }

    #[test]
    fn test_blocks_before_start_produce_no_events() {
        let (notifier, _rx) = notifier(100, 10, 0);
        let events = run_blocks(&notifier, 90..100);
        assert!(events.is_empty());
    }

    #[test]
    fn test_next_epoch_rearms_notification() {
        let (notifier, _rx) = notifier(100, 10, 50);
        let events = run_blocks(&notifier, 100..=119);
        assert_eq!(events.iter().map(|e| e.epoch).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_zero_percentage_fires_at_epoch_start() {
        let (notifier, _rx) = notifier(100, 10, 0);
        let events = run_blocks(&notifier, 101..=102);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].epoch, 1);
    }

    #[test]
    fn test_threshold_is_capped_below_the_epoch_end() {
        // pct=99 of a 2-block epoch caps at block N-1 so the event still
        // fires inside the epoch.
        let (notifier, _rx) = notifier(10, 2, 99);
        let events = run_blocks(&notifier, 10..=13);
        assert_eq!(events.iter().map(|e| e.epoch).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(EpochNotifier::new(EpochNotifierConfig {
            starting_epoch_block: 0,
            num_block_per_epoch: 0,
            epoch_notification_percentage: 0,
        })
        .is_err());
        assert!(EpochNotifier::new(EpochNotifierConfig {
            starting_epoch_block: 0,
            num_block_per_epoch: 10,
            epoch_notification_percentage: 100,
        })
        .is_err());
    }
}
