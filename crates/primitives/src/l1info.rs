use crate::bytes::u64_to_be_bytes;

use alloy_primitives::{keccak256, B256};

/// A leaf of the L1 info tree.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct L1InfoTreeLeaf {
    /// The L1 block the leaf was inserted at.
    pub block_number: u64,
    /// The position of the log inside the block.
    pub block_position: u64,
    /// The index of the leaf in the L1 info tree.
    pub l1_info_tree_index: u32,
    /// The hash of the block preceding the insertion block.
    pub previous_block_hash: B256,
    /// The timestamp of the insertion block.
    pub timestamp: u64,
    /// The mainnet exit root at insertion time.
    pub mainnet_exit_root: B256,
    /// The rollup exit root at insertion time.
    pub rollup_exit_root: B256,
}

impl L1InfoTreeLeaf {
    /// The global exit root committed by the leaf:
    /// `keccak256(mainnet_exit_root || rollup_exit_root)`.
    pub fn global_exit_root(&self) -> B256 {
        let mut input = [0u8; 64];
        input[..32].copy_from_slice(self.mainnet_exit_root.as_slice());
        input[32..].copy_from_slice(self.rollup_exit_root.as_slice());
        keccak256(input)
    }

    /// The hash of the leaf as inserted in the L1 info tree:
    /// `keccak256(global_exit_root || previous_block_hash || be64(timestamp))`.
    pub fn hash(&self) -> B256 {
        let mut input = [0u8; 72];
        input[..32].copy_from_slice(self.global_exit_root().as_slice());
        input[32..64].copy_from_slice(self.previous_block_hash.as_slice());
        input[64..].copy_from_slice(&u64_to_be_bytes(self.timestamp));
        keccak256(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    #[test]
    fn test_leaf_hash_layout() {
        let leaf = L1InfoTreeLeaf {
            block_number: 1,
            previous_block_hash: B256::from(U256::from(0x1010101u64)),
            timestamp: 420,
            mainnet_exit_root: B256::from(U256::from(0xbeefu64)),
            rollup_exit_root: B256::from(U256::from(0x5ca1eu64)),
            ..Default::default()
        };

        let ger = keccak256(
            [leaf.mainnet_exit_root.as_slice(), leaf.rollup_exit_root.as_slice()].concat(),
        );
        assert_eq!(leaf.global_exit_root(), ger);

        let expected = keccak256(
            [ger.as_slice(), leaf.previous_block_hash.as_slice(), &420u64.to_be_bytes()[..]]
                .concat(),
        );
        assert_eq!(leaf.hash(), expected);
    }
}
