//! Persisted sparse Merkle trees of fixed height 32, hashed with
//! `keccak256(left || right)`.
//!
//! Two flavors exist: the [`AppendTree`] (L1 info tree, local exit trees)
//! inserts leaves at strictly increasing positions; the [`UpdatableTree`]
//! (rollup exit tree) overwrites leaves in place. Both persist their nodes
//! and versioned roots through the [`aggkit_db`] tree operations, so inserts
//! join the processor's database transaction.

mod append;
pub use append::{AppendTree, FrontierSnapshot};

mod error;
pub use error::TreeError;

mod updatable;
pub use updatable::UpdatableTree;

use alloy_primitives::{keccak256, B256};
use std::sync::LazyLock;

/// The height of every tree.
pub const DEFAULT_HEIGHT: usize = 32;

/// An inclusion proof: one sibling per level, leaf level first.
pub type Proof = [B256; DEFAULT_HEIGHT];

/// The roots of the empty subtrees, indexed by height: entry 0 is the empty
/// leaf, entry 32 the root of the fully empty tree.
pub static ZERO_HASHES: LazyLock<[B256; DEFAULT_HEIGHT + 1]> = LazyLock::new(|| {
    let mut hashes = [B256::ZERO; DEFAULT_HEIGHT + 1];
    for height in 0..DEFAULT_HEIGHT {
        hashes[height + 1] = hash_pair(hashes[height], hashes[height]);
    }
    hashes
});

/// The proof of any leaf against the empty tree.
pub fn empty_proof() -> Proof {
    let mut proof = [B256::ZERO; DEFAULT_HEIGHT];
    proof.copy_from_slice(&ZERO_HASHES[..DEFAULT_HEIGHT]);
    proof
}

/// The root of the fully empty tree.
pub fn empty_root() -> B256 {
    ZERO_HASHES[DEFAULT_HEIGHT]
}

pub(crate) fn hash_pair(left: B256, right: B256) -> B256 {
    let mut input = [0u8; 64];
    input[..32].copy_from_slice(left.as_slice());
    input[32..].copy_from_slice(right.as_slice());
    keccak256(input)
}

/// Folds the proof over the leaf, returning the root it commits to. The
/// proof verifies iff the returned root equals the expected one.
pub fn compute_root_from_proof(leaf_hash: B256, leaf_index: u32, proof: &Proof) -> B256 {
    let mut current = leaf_hash;
    for (height, sibling) in proof.iter().enumerate() {
        if (leaf_index >> height) & 1 == 1 {
            current = hash_pair(*sibling, current);
        } else {
            current = hash_pair(current, *sibling);
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_proof_verifies_empty_root() {
        let root = compute_root_from_proof(B256::ZERO, 0, &empty_proof());
        assert_eq!(root, empty_root());
    }

    #[test]
    fn test_zero_hashes_are_chained() {
        assert_eq!(ZERO_HASHES[1], hash_pair(B256::ZERO, B256::ZERO));
        assert_eq!(ZERO_HASHES[32], hash_pair(ZERO_HASHES[31], ZERO_HASHES[31]));
    }
}
