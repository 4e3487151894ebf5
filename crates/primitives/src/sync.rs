use alloy_primitives::Address;

/// The runtime identity of a syncer: the chain it talks to and the contracts
/// it queries. Persisted on first start and checked on every restart so a
/// database built against a different chain or contract set is never reused.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RuntimeData {
    /// The chain id of the RPC endpoint.
    pub chain_id: u64,
    /// The contract addresses the syncer filters logs for.
    pub addresses: Vec<Address>,
}

/// A versioned root of a persisted Merkle tree. Index `i` is the root after
/// the leaf at position `i` was inserted.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TreeRoot {
    /// The root hash.
    pub hash: alloy_primitives::B256,
    /// The index of the last inserted leaf.
    pub index: u32,
    /// The block at which the leaf was inserted.
    pub block_num: u64,
    /// The position of the originating log inside the block.
    pub block_position: u64,
}
