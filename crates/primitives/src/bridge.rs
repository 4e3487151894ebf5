use crate::bytes::u32_to_be_bytes;

use alloy_primitives::{keccak256, Address, B256, U256};

/// A bridge event indexed from the bridge contract.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct Bridge {
    /// The block the event was emitted at.
    pub block_num: u64,
    /// The position of the log inside the block.
    pub block_pos: u64,
    /// The hash of the transaction that emitted the event.
    pub tx_hash: B256,
    /// The sender of the bridge transaction.
    pub from_address: Address,
    /// The type of the leaf (0 asset, 1 message).
    pub leaf_type: u8,
    /// The network the bridged token originates from.
    pub origin_network: u32,
    /// The address of the token on its origin network.
    pub origin_address: Address,
    /// The network the bridge exit targets.
    pub destination_network: u32,
    /// The recipient on the destination network.
    pub destination_address: Address,
    /// The bridged amount.
    pub amount: U256,
    /// The bridge metadata.
    pub metadata: Vec<u8>,
    /// The index of the exit in the local exit tree.
    pub deposit_count: u32,
    /// Whether the bridged token is the native token of the origin network.
    pub is_native_token: bool,
    /// The raw calldata of the bridge transaction.
    pub calldata: Vec<u8>,
    /// The timestamp of the block the event was emitted at.
    pub block_timestamp: u64,
}

impl Bridge {
    /// Returns the hash of the bridge event, which is the leaf inserted in the
    /// local exit tree.
    pub fn hash(&self) -> B256 {
        let mut input = Vec::with_capacity(113);
        input.push(self.leaf_type);
        input.extend_from_slice(&u32_to_be_bytes(self.origin_network));
        input.extend_from_slice(self.origin_address.as_slice());
        input.extend_from_slice(&u32_to_be_bytes(self.destination_network));
        input.extend_from_slice(self.destination_address.as_slice());
        input.extend_from_slice(&self.amount.to_be_bytes::<32>());
        input.extend_from_slice(keccak256(&self.metadata).as_slice());
        keccak256(input)
    }
}

/// A claim event indexed from the bridge contract.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct Claim {
    /// The block the event was emitted at.
    pub block_num: u64,
    /// The position of the log inside the block.
    pub block_pos: u64,
    /// The hash of the transaction that emitted the event.
    pub tx_hash: B256,
    /// The packed global index of the claimed exit.
    pub global_index: U256,
    /// The network the claimed token originates from.
    pub origin_network: u32,
    /// The address of the token on its origin network.
    pub origin_address: Address,
    /// The recipient of the claim.
    pub destination_address: Address,
    /// The claimed amount.
    pub amount: U256,
    /// The mainnet exit root the claim was proven against.
    pub mainnet_exit_root: B256,
    /// The rollup exit root the claim was proven against.
    pub rollup_exit_root: B256,
    /// The global exit root the claim was proven against.
    pub global_exit_root: B256,
    /// The destination network of the claim.
    pub destination_network: u32,
    /// The claim metadata.
    pub metadata: Vec<u8>,
    /// The timestamp of the block the event was emitted at.
    pub block_timestamp: u64,
    /// The SMT proof of the exit in its origin exit tree, recovered from the
    /// claim transaction calldata.
    pub proof_local_exit_root: Option<Box<[B256; 32]>>,
    /// The SMT proof of the origin local exit root in the rollup exit tree,
    /// recovered from the claim transaction calldata.
    pub proof_rollup_exit_root: Option<Box<[B256; 32]>>,
}

impl Claim {
    /// Returns the decoded [`GlobalIndex`] of the claim.
    pub fn decoded_global_index(&self) -> GlobalIndex {
        GlobalIndex::decode(self.global_index)
    }
}

/// The unpacked representation of a claim's global index.
///
/// The packed layout is `mainnet_flag << 64 | rollup_index << 32 | leaf_index`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct GlobalIndex {
    /// Set when the exit originates on the mainnet.
    pub mainnet_flag: bool,
    /// The index of the origin rollup, unused when the mainnet flag is set.
    pub rollup_index: u32,
    /// The index of the exit in the origin local exit tree.
    pub leaf_index: u32,
}

impl GlobalIndex {
    /// Returns a new instance of [`GlobalIndex`].
    pub const fn new(mainnet_flag: bool, rollup_index: u32, leaf_index: u32) -> Self {
        Self { mainnet_flag, rollup_index, leaf_index }
    }

    /// Packs the global index into its uint256 representation.
    pub fn encode(&self) -> U256 {
        let mut value = U256::from(self.leaf_index);
        value |= U256::from(self.rollup_index) << 32;
        if self.mainnet_flag {
            value |= U256::from(1u64) << 64;
        }
        value
    }

    /// Unpacks a uint256 global index.
    pub fn decode(value: U256) -> Self {
        let leaf_index = (value & U256::from(u32::MAX)).to::<u32>();
        let rollup_index = ((value >> U256::from(32u32)) & U256::from(u32::MAX)).to::<u32>();
        let mainnet_flag = value.bit(64);
        Self { mainnet_flag, rollup_index, leaf_index }
    }

    /// Returns the hash of the global index as expected by the agglayer:
    /// keccak of the minimal little-endian encoding of the packed value.
    pub fn hash(&self) -> B256 {
        keccak256(crate::big_int_to_little_endian_bytes(self.encode()))
    }
}

/// A token mapping event emitted when a wrapped token is deployed.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct TokenMapping {
    /// The block the event was emitted at.
    pub block_num: u64,
    /// The position of the log inside the block.
    pub block_pos: u64,
    /// The hash of the transaction that emitted the event.
    pub tx_hash: B256,
    /// The network the mapped token originates from.
    pub origin_network: u32,
    /// The address of the token on its origin network.
    pub origin_token_address: Address,
    /// The address of the wrapped token on this network.
    pub wrapped_token_address: Address,
    /// The token metadata (name, symbol, decimals abi-encoded).
    pub metadata: Vec<u8>,
    /// The timestamp of the block the event was emitted at.
    pub block_timestamp: u64,
}

/// A legacy token migration event.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct LegacyTokenMigration {
    /// The block the event was emitted at.
    pub block_num: u64,
    /// The position of the log inside the block.
    pub block_pos: u64,
    /// The hash of the transaction that emitted the event.
    pub tx_hash: B256,
    /// The holder migrating the tokens.
    pub sender: Address,
    /// The legacy wrapped token address.
    pub legacy_token_address: Address,
    /// The updated wrapped token address.
    pub updated_token_address: Address,
    /// The migrated amount.
    pub amount: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_index_round_trip() {
        let cases = [
            GlobalIndex::new(true, 0, 0),
            GlobalIndex::new(false, 0, 0),
            GlobalIndex::new(false, 7, 42),
            GlobalIndex::new(true, u32::MAX, u32::MAX),
        ];
        for case in cases {
            assert_eq!(GlobalIndex::decode(case.encode()), case);
        }
    }

    #[test]
    fn test_global_index_encode_layout() {
        let index = GlobalIndex::new(true, 2, 3);
        let expected = (U256::from(1u64) << 64) | (U256::from(2u64) << 32) | U256::from(3u64);
        assert_eq!(index.encode(), expected);
    }

    #[test]
    fn test_bridge_hash_changes_with_metadata() {
        let bridge = Bridge { amount: U256::from(10u64), ..Default::default() };
        let mut with_metadata = bridge.clone();
        with_metadata.metadata = vec![1, 2, 3];
        assert_ne!(bridge.hash(), with_metadata.hash());
    }
}
