use alloy_primitives::{Address, B256};

/// The typed union of the events the L1 info tree syncer consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A new leaf was appended to the on-chain L1 info tree.
    UpdateL1InfoTree(UpdateL1InfoTree),
    /// The contract reported the root of the L1 info tree after an append.
    UpdateL1InfoTreeV2(UpdateL1InfoTreeV2),
    /// A rollup's batches were verified, updating its exit root.
    VerifyBatches(VerifyBatches),
    /// The initial L1 info root snapshot.
    InitL1InfoRootMap(InitL1InfoRootMap),
}

/// The payload of the `UpdateL1InfoTree` event, enriched with the block
/// context the new leaf commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateL1InfoTree {
    /// The position of the log inside the block.
    pub block_position: u64,
    /// The mainnet exit root of the new leaf.
    pub mainnet_exit_root: B256,
    /// The rollup exit root of the new leaf.
    pub rollup_exit_root: B256,
    /// The parent hash of the emitting block.
    pub parent_hash: B256,
    /// The timestamp of the emitting block.
    pub timestamp: u64,
}

/// The payload of the `UpdateL1InfoTreeV2` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateL1InfoTreeV2 {
    /// The on-chain L1 info root after the append.
    pub current_l1_info_root: B256,
    /// The on-chain leaf count after the append.
    pub leaf_count: u32,
    /// The hash of the emitting block.
    pub block_hash: B256,
    /// The minimum timestamp of the appended leaf.
    pub min_timestamp: u64,
}

/// The payload of the `VerifyBatchesTrustedAggregator` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyBatches {
    /// The position of the log inside the block.
    pub block_position: u64,
    /// The id of the verified rollup.
    pub rollup_id: u32,
    /// The last verified batch number.
    pub num_batch: u64,
    /// The state root of the verified batch.
    pub state_root: B256,
    /// The new local exit root of the rollup.
    pub exit_root: B256,
    /// The aggregator that submitted the proof.
    pub aggregator: Address,
}

/// The payload of the `InitL1InfoRootMap` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitL1InfoRootMap {
    /// The leaf count of the snapshot.
    pub leaf_count: u32,
    /// The L1 info root of the snapshot.
    pub current_l1_info_root: B256,
}
