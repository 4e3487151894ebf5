use crate::certificate::BridgeExit;

use aggkit_primitives::{big_int_to_little_endian_bytes, u64_to_be_bytes, GlobalIndex};
use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};

/// The height of the agglayer Merkle trees.
pub const PROOF_HEIGHT: usize = 32;

/// An inclusion proof of a leaf in a height-32 Merkle tree. Serializes as
/// `{"root": ..., "proof": {"siblings": [...]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The root the proof folds to.
    pub root: B256,
    /// The sibling hashes, leaf level first.
    #[serde(with = "siblings")]
    pub proof: [B256; PROOF_HEIGHT],
}

impl Default for MerkleProof {
    fn default() -> Self {
        Self { root: B256::ZERO, proof: [B256::ZERO; PROOF_HEIGHT] }
    }
}

impl MerkleProof {
    /// Returns the hash of the proof: `keccak256(root || siblings...)`.
    pub fn hash(&self) -> B256 {
        let mut input = Vec::with_capacity(32 + 32 * PROOF_HEIGHT);
        input.extend_from_slice(self.root.as_slice());
        for sibling in &self.proof {
            input.extend_from_slice(sibling.as_slice());
        }
        keccak256(input)
    }
}

mod siblings {
    use super::{B256, PROOF_HEIGHT};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Siblings {
        siblings: [B256; PROOF_HEIGHT],
    }

    pub(super) fn serialize<S: Serializer>(
        proof: &[B256; PROOF_HEIGHT],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        Siblings { siblings: *proof }.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[B256; PROOF_HEIGHT], D::Error> {
        Ok(Siblings::deserialize(deserializer)?.siblings)
    }
}

/// The inner part of an L1 info tree leaf.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L1InfoTreeLeafInner {
    /// The global exit root committed by the leaf.
    pub global_exit_root: B256,
    /// The hash of the block preceding the insertion block.
    pub block_hash: B256,
    /// The timestamp of the insertion block.
    pub timestamp: u64,
}

impl L1InfoTreeLeafInner {
    /// Returns the hash of the leaf as inserted in the L1 info tree.
    pub fn hash(&self) -> B256 {
        let mut input = [0u8; 72];
        input[..32].copy_from_slice(self.global_exit_root.as_slice());
        input[32..64].copy_from_slice(self.block_hash.as_slice());
        input[64..].copy_from_slice(&u64_to_be_bytes(self.timestamp));
        keccak256(input)
    }
}

/// An L1 info tree leaf with its exit-root context, as shipped inside claims
/// and prover requests.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L1InfoTreeLeaf {
    /// The index of the leaf in the L1 info tree.
    pub l1_info_tree_index: u32,
    /// The rollup exit root at insertion time.
    pub rer: B256,
    /// The mainnet exit root at insertion time.
    pub mer: B256,
    /// The inner leaf.
    pub inner: L1InfoTreeLeafInner,
}

impl L1InfoTreeLeaf {
    /// Returns the hash of the leaf.
    pub fn hash(&self) -> B256 {
        self.inner.hash()
    }
}

/// The inclusion data of a claim whose exit originates on the mainnet.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimFromMainnet {
    /// Proof of the exit leaf in the mainnet exit tree.
    pub proof_leaf_mer: MerkleProof,
    /// Proof of the global exit root in the L1 info tree.
    #[serde(rename = "proof_ger_l1root")]
    pub proof_ger_l1_root: MerkleProof,
    /// The L1 info leaf the proofs anchor to.
    pub l1_leaf: L1InfoTreeLeaf,
}

impl ClaimFromMainnet {
    /// Returns the hash of the claim inclusion data.
    pub fn hash(&self) -> B256 {
        let mut input = [0u8; 96];
        input[..32].copy_from_slice(self.proof_leaf_mer.hash().as_slice());
        input[32..64].copy_from_slice(self.proof_ger_l1_root.hash().as_slice());
        input[64..].copy_from_slice(self.l1_leaf.hash().as_slice());
        keccak256(input)
    }
}

/// The inclusion data of a claim whose exit originates on another rollup.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimFromRollup {
    /// Proof of the exit leaf in the origin local exit tree.
    pub proof_leaf_ler: MerkleProof,
    /// Proof of the local exit root in the rollup exit tree.
    #[serde(rename = "proof_ler_rer")]
    pub proof_ler_rer: MerkleProof,
    /// Proof of the global exit root in the L1 info tree.
    #[serde(rename = "proof_ger_l1root")]
    pub proof_ger_l1_root: MerkleProof,
    /// The L1 info leaf the proofs anchor to.
    pub l1_leaf: L1InfoTreeLeaf,
}

impl ClaimFromRollup {
    /// Returns the hash of the claim inclusion data.
    pub fn hash(&self) -> B256 {
        let mut input = [0u8; 128];
        input[..32].copy_from_slice(self.proof_leaf_ler.hash().as_slice());
        input[32..64].copy_from_slice(self.proof_ler_rer.hash().as_slice());
        input[64..96].copy_from_slice(self.proof_ger_l1_root.hash().as_slice());
        input[96..].copy_from_slice(self.l1_leaf.hash().as_slice());
        keccak256(input)
    }
}

/// The claim inclusion data, discriminated on the wire by its unique key
/// (`Mainnet` or `Rollup`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimData {
    /// A claim of a mainnet exit.
    Mainnet(Box<ClaimFromMainnet>),
    /// A claim of a rollup exit.
    Rollup(Box<ClaimFromRollup>),
}

impl ClaimData {
    /// Returns the hash of the claim inclusion data.
    pub fn hash(&self) -> B256 {
        match self {
            Self::Mainnet(claim) => claim.hash(),
            Self::Rollup(claim) => claim.hash(),
        }
    }
}

/// A bridge exit originating on another network, claimed on this one,
/// accompanied by the Merkle proofs placing it inside the L1 info tree.
/// The claim data is absent in the reduced form shipped to the prover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedBridgeExit {
    /// The claimed exit.
    pub bridge_exit: BridgeExit,
    /// The inclusion data of the claim.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub claim_data: Option<ClaimData>,
    /// The global index of the claimed exit.
    pub global_index: GlobalIndex,
}

impl ImportedBridgeExit {
    /// Returns a hash that uniquely identifies the imported bridge exit.
    pub fn hash(&self) -> B256 {
        let claim_data_hash =
            self.claim_data.as_ref().map(|claim| claim.hash()).unwrap_or_else(|| keccak256([]));
        let mut input = [0u8; 96];
        input[..32].copy_from_slice(self.bridge_exit.hash().as_slice());
        input[32..64].copy_from_slice(claim_data_hash.as_slice());
        input[64..].copy_from_slice(self.global_index_hash().as_slice());
        keccak256(input)
    }

    /// Returns the hash of the global index.
    pub fn global_index_hash(&self) -> B256 {
        self.global_index.hash()
    }

    /// Returns the minimal little-endian encoding of the packed global index.
    pub fn global_index_little_endian_bytes(&self) -> Vec<u8> {
        big_int_to_little_endian_bytes(self.global_index.encode())
    }
}

/// An imported bridge exit together with the L2 block it was claimed at, as
/// shipped to the prover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedBridgeExitWithBlockNumber {
    /// The L2 block the claim happened at.
    pub block_number: u64,
    /// The imported bridge exit.
    pub imported_bridge_exit: ImportedBridgeExit,
}

/// A GER injected on the L2, proven against the L1 info tree.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenInsertedGer {
    /// Proof of the GER leaf in the L1 info tree.
    #[serde(rename = "proof_ger_l1root")]
    pub proof_ger_l1_root: MerkleProof,
    /// The L1 info leaf committing the GER.
    pub l1_leaf: L1InfoTreeLeaf,
}

/// A proven injected GER with the L2 block it was injected at.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenInsertedGerWithBlockNumber {
    /// The L2 block the GER was injected at.
    pub block_number: u64,
    /// The proven injected GER.
    #[serde(rename = "inserted_ger_leaf")]
    pub inserted_ger_leaf: ProvenInsertedGer,
    /// The position of the injection inside the block.
    pub block_index: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merkle_proof_serializes_with_siblings_key() {
        let proof = MerkleProof { root: B256::repeat_byte(1), proof: [B256::repeat_byte(2); 32] };
        let encoded = serde_json::to_value(&proof).unwrap();
        assert_eq!(encoded["proof"]["siblings"].as_array().unwrap().len(), 32);

        let decoded: MerkleProof = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, proof);
    }

    #[test]
    fn test_claim_data_tagged_by_unique_key() {
        let mainnet = ClaimData::Mainnet(Box::new(ClaimFromMainnet::default()));
        let encoded = serde_json::to_value(&mainnet).unwrap();
        assert!(encoded.get("Mainnet").is_some());
        assert_eq!(serde_json::from_value::<ClaimData>(encoded).unwrap(), mainnet);

        let rollup = ClaimData::Rollup(Box::new(ClaimFromRollup::default()));
        let encoded = serde_json::to_value(&rollup).unwrap();
        assert!(encoded.get("Rollup").is_some());
        assert_eq!(serde_json::from_value::<ClaimData>(encoded).unwrap(), rollup);
    }

    #[test]
    fn test_l1_info_tree_leaf_inner_hash_layout() {
        let inner = L1InfoTreeLeafInner {
            global_exit_root: B256::repeat_byte(0xaa),
            block_hash: B256::repeat_byte(0xbb),
            timestamp: 99,
        };
        let expected = keccak256(
            [
                inner.global_exit_root.as_slice(),
                inner.block_hash.as_slice(),
                &99u64.to_be_bytes()[..],
            ]
            .concat(),
        );
        assert_eq!(inner.hash(), expected);
    }
}
